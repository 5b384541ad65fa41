//! Test-only helpers for constructing configurations and jobs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::compile::CompileOptions;
use crate::core::job::JobDescriptor;
use crate::core::raw::RawConfig;
use crate::core::resolve::DEFAULT_REFERENCE_BUDGET;
use crate::core::value::{Config, Value};

/// Build an ordered configuration from `(key, value)` pairs.
pub fn config(entries: &[(&str, Value)]) -> Config {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

pub fn raw_config(global: Config, jobs: Vec<Config>) -> RawConfig {
    RawConfig { global, jobs }
}

/// Compile options with a fixed timestamp so default log paths are stable.
pub fn fixed_options() -> CompileOptions {
    CompileOptions {
        reference_budget: DEFAULT_REFERENCE_BUDGET,
        timestamp: Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .expect("unambiguous timestamp"),
    }
}

/// A job descriptor that runs `command` and writes stdout to `log_path`.
pub fn job(label: &str, command: &str, log_path: &str) -> JobDescriptor {
    JobDescriptor {
        label: label.to_string(),
        priority: 0.0,
        load: 1.0,
        command: command.to_string(),
        log_path: log_path.to_string(),
        full_config: Config::new(),
        resolved_config: Config::new(),
    }
}

/// Write a sweep file into `dir` and return its path.
pub fn write_sweep_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write sweep file");
    path
}

/// Temporary directory holding sweep files and job logs.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}
