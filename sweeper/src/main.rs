//! Experiment-sweep compiler and job runner.
//!
//! Reads a sweep file (`@global` defaults plus a `@jobs` list), expands its
//! `@sweep` and distribution directives into concrete jobs, and either
//! prints the resulting commands or runs them.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sweeper::cli::{RunFlags, compile_file, run_file};
use sweeper::exit_codes;
use sweeper::io::config::DEFAULT_SETTINGS_FILE;
use sweeper::logging;

#[derive(Parser)]
#[command(
    name = "sweeper",
    version,
    about = "Compile experiment sweeps into shell commands and run them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compiled command for every job.
    Compile {
        /// Sweep file (`.toml` or `.json`).
        file: PathBuf,
        /// Override applied to every job, as `KEY=VALUE`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
        /// Print job descriptors as JSON instead of bare commands.
        #[arg(long)]
        json: bool,
        /// Settings file.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
    },
    /// Compile the sweep and execute its jobs.
    Run {
        /// Sweep file (`.toml` or `.json`).
        file: PathBuf,
        /// Override applied to every job, as `KEY=VALUE`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
        /// Print commands without spawning them.
        #[arg(long)]
        dry_run: bool,
        /// Launch all jobs at once instead of one after another.
        #[arg(long)]
        concurrent: bool,
        /// Continue past failed or uncompilable jobs.
        #[arg(long)]
        keep_going: bool,
        /// Settings file.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Compile {
            file,
            overrides,
            json,
            settings,
        } => compile_file(&file, &overrides, &settings, json),
        Command::Run {
            file,
            overrides,
            dry_run,
            concurrent,
            keep_going,
            settings,
        } => run_file(
            &file,
            &overrides,
            &settings,
            RunFlags {
                dry_run,
                concurrent,
                keep_going,
            },
        ),
    }
}
