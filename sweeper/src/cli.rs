//! Command implementations behind the `sweeper` binary.
//!
//! Each command returns an exit code from [`crate::exit_codes`]. Errors that
//! escape as `Err` are configuration problems and map to
//! [`exit_codes::INVALID`] in `main`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::compile::{CompileOptions, compile_each, compile_jobs};
use crate::core::job::JobDescriptor;
use crate::exit_codes;
use crate::io::concurrent::run_jobs_concurrent_blocking;
use crate::io::config::{SweeperConfig, load_config};
use crate::io::process::{ExecOptions, JobFailedError, run_jobs_blocking};
use crate::io::sweep_file::{load_sweep_file, parse_overrides};

/// Flags for `sweeper run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub dry_run: bool,
    pub concurrent: bool,
    pub keep_going: bool,
}

fn compile_options(settings: &SweeperConfig) -> CompileOptions {
    CompileOptions {
        reference_budget: settings.reference_budget,
        ..CompileOptions::default()
    }
}

/// Render compiled jobs as one command per line, or as a JSON array.
pub fn render_jobs(jobs: &[JobDescriptor], json: bool) -> Result<String> {
    if json {
        let mut payload = serde_json::to_string_pretty(jobs).context("serialize jobs")?;
        payload.push('\n');
        return Ok(payload);
    }
    Ok(jobs.iter().map(|job| format!("{}\n", job.command)).collect())
}

/// `sweeper compile`: print the compiled jobs without running them.
pub fn compile_file(
    path: &Path,
    overrides: &[String],
    settings_path: &Path,
    json: bool,
) -> Result<i32> {
    let settings = load_config(settings_path)?;
    let raw = load_sweep_file(path)?;
    let overrides = parse_overrides(overrides)?;
    let jobs = compile_jobs(&raw, &overrides, &compile_options(&settings))
        .with_context(|| format!("compile {}", path.display()))?;
    print!("{}", render_jobs(&jobs, json)?);
    Ok(exit_codes::OK)
}

/// `sweeper run`: compile the sweep and execute its jobs.
///
/// Jobs whose references never converge are reported; with `keep_going` the
/// remaining jobs still run and the command exits with
/// [`exit_codes::JOB_FAILED`], otherwise nothing runs.
pub fn run_file(
    path: &Path,
    overrides: &[String],
    settings_path: &Path,
    flags: RunFlags,
) -> Result<i32> {
    let settings = load_config(settings_path)?;
    let raw = load_sweep_file(path)?;
    let overrides = parse_overrides(overrides)?;
    let outcomes = compile_each(&raw, &overrides, &compile_options(&settings))
        .with_context(|| format!("compile {}", path.display()))?;

    let mut jobs = Vec::with_capacity(outcomes.len());
    let mut skipped = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(job) => jobs.push(job),
            Err(err) if flags.keep_going => {
                eprintln!("skipping: {err}");
                skipped += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("compile {}", path.display()));
            }
        }
    }

    let options = ExecOptions::from_config(&settings, flags.dry_run);
    let failed = if flags.concurrent {
        run_concurrent(&jobs, &options)?
    } else {
        match run_jobs_blocking(&jobs, &options, flags.keep_going) {
            Ok(outcome) => outcome.failed.len(),
            Err(err) => {
                let Some(failed) = err.downcast_ref::<JobFailedError>() else {
                    return Err(err);
                };
                eprintln!("{failed}");
                eprint!("{}", failed.output);
                1
            }
        }
    };

    info!(jobs = jobs.len(), failed, skipped, "run finished");
    if failed + skipped > 0 {
        return Ok(exit_codes::JOB_FAILED);
    }
    Ok(exit_codes::OK)
}

/// Run all jobs concurrently and count the ones that did not exit cleanly.
fn run_concurrent(jobs: &[JobDescriptor], options: &ExecOptions) -> Result<usize> {
    let results = run_jobs_concurrent_blocking(jobs, options)?;
    let mut failed = 0;
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(0) => {}
            Ok(code) => {
                warn!(job = %job.label, exit_code = code, "job failed");
                failed += 1;
            }
            Err(err) => {
                eprintln!("{:#}", err);
                failed += 1;
            }
        }
    }
    Ok(failed)
}
