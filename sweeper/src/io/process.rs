//! Blocking job execution through a shell.

use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::core::job::JobDescriptor;
use crate::io::config::SweeperConfig;

/// How jobs are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Print commands instead of spawning them.
    pub dry_run: bool,
    /// Shell invoked as `<shell> -c <command>`.
    pub shell: String,
    /// `log_path` value that keeps stdout on the console.
    pub console_log_path: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::from_config(&SweeperConfig::default(), false)
    }
}

impl ExecOptions {
    pub fn from_config(cfg: &SweeperConfig, dry_run: bool) -> Self {
        Self {
            dry_run,
            shell: cfg.shell.clone(),
            console_log_path: cfg.console_log_path.clone(),
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// A job exited unsuccessfully in blocking mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{label}: command {command:?} exited with code {exit_code}")]
pub struct JobFailedError {
    pub label: String,
    pub command: String,
    pub exit_code: i32,
    /// Captured stdout followed by stderr.
    pub output: String,
}

/// Outcome of [`run_jobs_blocking`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    /// Labels of failed jobs, in run order.
    pub failed: Vec<String>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Wall-clock timestamp for progress lines.
pub(crate) fn timestamp() -> String {
    Local::now().format("%Y-%m-%d (%H:%M:%S)").to_string()
}

/// Exit code of a finished child; negative signal number when killed by one.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Print the command a dry run would have launched.
pub(crate) fn report_dry_run(job: &JobDescriptor) {
    println!("dry-run: {} {:?}", job.label, job.command);
}

/// Run `job` to completion, blocking the current thread.
///
/// A nonzero exit is returned as a [`JobFailedError`] carrying the captured
/// output; the caller decides whether the batch continues.
#[instrument(skip_all, fields(job = %job.label))]
pub fn run_job(job: &JobDescriptor, options: &ExecOptions) -> Result<Duration> {
    if options.dry_run {
        report_dry_run(job);
        return Ok(Duration::ZERO);
    }

    let start = Instant::now();
    println!("[{}] running {:?}", timestamp(), job.command);
    debug!(shell = %options.shell, "spawning job");
    let output = match Command::new(&options.shell)
        .arg("-c")
        .arg(&job.command)
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            error!(err = %e, "failed to spawn job");
            return Err(e).with_context(|| format!("spawn {}", job.label));
        }
    };
    let elapsed = start.elapsed();

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    let code = exit_code(output.status);
    if code != 0 {
        warn!(exit_code = code, "job failed");
        return Err(JobFailedError {
            label: job.label.clone(),
            command: job.command.clone(),
            exit_code: code,
            output: String::from_utf8_lossy(&combined).into_owned(),
        }
        .into());
    }

    info!(elapsed_ms = elapsed.as_millis() as u64, "job finished");
    println!(
        "[{}] finished {:?} in {:.2?}",
        timestamp(),
        job.command,
        elapsed
    );
    Ok(elapsed)
}

/// Run jobs one after another.
///
/// With `keep_going`, a failed job is reported and the batch continues;
/// otherwise the first [`JobFailedError`] is returned. Spawn errors always
/// abort.
pub fn run_jobs_blocking(
    jobs: &[JobDescriptor],
    options: &ExecOptions,
    keep_going: bool,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for job in jobs {
        match run_job(job, options) {
            Ok(_) => outcome.succeeded += 1,
            Err(err) => {
                let Some(failed) = err.downcast_ref::<JobFailedError>() else {
                    return Err(err);
                };
                if !keep_going {
                    return Err(err);
                }
                eprintln!("{failed}");
                eprint!("{}", failed.output);
                outcome.failed.push(failed.label.clone());
            }
        }
    }
    Ok(outcome)
}
