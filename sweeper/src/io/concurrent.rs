//! Cooperative concurrent job execution.
//!
//! Jobs run as tokio tasks on a single-threaded runtime. Each job's only
//! suspension point is waiting for its child to exit while its stderr pipe is
//! drained. There is no concurrency cap, no ordering guarantee between jobs,
//! and no cross-job cancellation: a failing job is reported and its siblings
//! keep running.

use std::fs::{self, File};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::core::job::JobDescriptor;
use crate::io::process::{ExecOptions, exit_code, report_dry_run, timestamp};

/// Open (truncate) the log file for a job, creating parent directories.
fn open_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("create log file {}", path.display()))
}

/// What a job's task does once it is polled.
enum Launch {
    DryRun,
    /// Spawn with this stdout (log file or inherited console).
    Spawn(Stdio),
}

/// Resolve a job's stdout, opening its log file.
///
/// Runs before the job's future is polled, so the blocking filesystem calls
/// never stall children that are already being supervised.
fn prepare(job: &JobDescriptor, options: &ExecOptions) -> Result<Launch> {
    if options.dry_run {
        return Ok(Launch::DryRun);
    }
    if job.logs_to_console(&options.console_log_path) {
        return Ok(Launch::Spawn(Stdio::inherit()));
    }
    let log = open_log(Path::new(&job.log_path))?;
    Ok(Launch::Spawn(Stdio::from(log)))
}

/// Run `job` and return its exit code.
///
/// Stdout goes to the job's log file unless the job logs to the console;
/// stderr is captured and printed when the job fails. A nonzero exit is a
/// normal return value, not an error. Errors are reserved for failures to
/// open the log or spawn the shell.
pub async fn run_job_async(job: &JobDescriptor, options: &ExecOptions) -> Result<i32> {
    let launch = prepare(job, options)?;
    supervise(job, options, launch).await
}

#[instrument(skip_all, fields(job = %job.label))]
async fn supervise(job: &JobDescriptor, options: &ExecOptions, launch: Launch) -> Result<i32> {
    let stdout = match launch {
        Launch::DryRun => {
            report_dry_run(job);
            return Ok(0);
        }
        Launch::Spawn(stdout) => stdout,
    };

    let start = Instant::now();
    println!("[{}] running {:?}", timestamp(), job.command);

    let mut cmd = Command::new(&options.shell);
    cmd.arg("-c")
        .arg(&job.command)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::piped());

    debug!(shell = %options.shell, log_path = %job.log_path, "spawning job");
    let child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", job.label))?;
    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("wait for {}", job.label))?;
    let elapsed = start.elapsed();
    let code = exit_code(output.status);

    if code != 0 {
        warn!(exit_code = code, "job failed");
        println!(
            "[{}] {:?} failed with exit code {} after {:.2?}",
            timestamp(),
            job.command,
            code,
            elapsed
        );
        println!("{}", String::from_utf8_lossy(&output.stderr));
        return Ok(code);
    }

    info!(elapsed_ms = elapsed.as_millis() as u64, "job finished");
    println!(
        "[{}] finished {:?} in {:.2?}",
        timestamp(),
        job.command,
        elapsed
    );
    Ok(0)
}

/// Launch every job at once and wait for all of them.
///
/// All log files are opened up front. Results are returned in job order,
/// independent of completion order.
pub async fn run_jobs_concurrent(
    jobs: &[JobDescriptor],
    options: &ExecOptions,
) -> Vec<Result<i32>> {
    let launches: Vec<Result<Launch>> = jobs.iter().map(|job| prepare(job, options)).collect();
    join_all(jobs.iter().zip(launches).map(|(job, launch)| async move {
        supervise(job, options, launch?).await
    }))
    .await
}

/// Drive [`run_jobs_concurrent`] on a fresh single-threaded runtime.
pub fn run_jobs_concurrent_blocking(
    jobs: &[JobDescriptor],
    options: &ExecOptions,
) -> Result<Vec<Result<i32>>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    Ok(runtime.block_on(run_jobs_concurrent(jobs, options)))
}
