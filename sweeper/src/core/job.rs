//! The compiled unit of work.

use serde::Serialize;

use crate::core::value::Config;

/// A ready-to-run job.
///
/// `priority` and `load` are scheduling hints for an external dispatcher and
/// are not interpreted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    /// `jobs[<entry>]#<combination>`, used in diagnostics.
    pub label: String,
    pub priority: f64,
    pub load: f64,
    /// Shell command line.
    pub command: String,
    /// Destination for the job's stdout, or the console literal.
    pub log_path: String,
    /// Concrete configuration before reference substitution.
    pub full_config: Config,
    /// Resolved configuration with reserved keys extracted.
    pub resolved_config: Config,
}

impl JobDescriptor {
    pub fn logs_to_console(&self, console_log_path: &str) -> bool {
        self.log_path == console_log_path
    }
}

/// Label for the `combination`-th expansion of job entry `entry`.
pub fn job_label(entry: usize, combination: usize) -> String {
    format!("jobs[{entry}]#{combination}")
}
