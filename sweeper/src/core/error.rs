//! Error taxonomy for the sweep compiler.

use thiserror::Error;

/// Failure while compiling a sweep into job descriptors.
///
/// Every variant except [`CompileError::NonTermination`] is a configuration
/// error and aborts the whole compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("sweep configuration is missing the `@jobs` list")]
    MissingJobs,

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid distribution for `{key}`: {reason}")]
    InvalidDistribution { key: String, reason: String },

    #[error("{job}: missing required `@program` key")]
    MissingProgram { job: String },

    #[error("{job}: unknown `@format` {format:?} (expected \"flag\" or \"=\")")]
    UnknownFormat { job: String, format: String },

    /// Reference substitution exhausted its iteration budget, most likely
    /// because of a reference cycle.
    #[error(
        "{job}: reference resolution did not converge within {budget} iterations (pending: {})",
        .keys.join(", ")
    )]
    NonTermination {
        job: String,
        keys: Vec<String>,
        budget: usize,
    },
}

impl CompileError {
    pub(crate) fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        CompileError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_distribution(key: &str, reason: impl Into<String>) -> Self {
        CompileError::InvalidDistribution {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
