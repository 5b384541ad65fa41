//! Raw sweep configuration and layer merging.

use tracing::warn;

use crate::core::directive::Marker;
use crate::core::error::CompileError;
use crate::core::value::{Config, Value};

/// A loaded sweep description: global defaults plus ordered job entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    pub global: Config,
    pub jobs: Vec<Config>,
}

impl RawConfig {
    /// Interpret a parsed document.
    ///
    /// `@global` is optional; `@jobs` is required and must be a list of maps.
    /// Other top-level keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, CompileError> {
        match value {
            Value::Map(root) => Self::from_config(root),
            other => Err(CompileError::invalid_value(
                "<root>",
                format!("expected a table, got {}", other.type_name()),
            )),
        }
    }

    pub fn from_config(mut root: Config) -> Result<Self, CompileError> {
        let global_key = Marker::Global.key();
        let jobs_key = Marker::Jobs.key();

        let global = match root.shift_remove(&global_key) {
            None => Config::new(),
            Some(Value::Map(global)) => global,
            Some(other) => {
                return Err(CompileError::invalid_value(
                    &global_key,
                    format!("expected a table, got {}", other.type_name()),
                ));
            }
        };

        let entries = match root.shift_remove(&jobs_key) {
            None => return Err(CompileError::MissingJobs),
            Some(Value::List(entries)) => entries,
            Some(other) => {
                return Err(CompileError::invalid_value(
                    &jobs_key,
                    format!("expected a list of tables, got {}", other.type_name()),
                ));
            }
        };
        let mut jobs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                Value::Map(job) => jobs.push(job),
                other => {
                    return Err(CompileError::invalid_value(
                        &format!("{jobs_key}[{index}]"),
                        format!("expected a table, got {}", other.type_name()),
                    ));
                }
            }
        }

        for key in root.keys() {
            warn!(key = %key, "ignoring unknown top-level key");
        }
        Ok(Self { global, jobs })
    }
}

/// Overlay `global`, then `local`, then `overrides`.
///
/// Last write wins with full replacement; an overwritten key keeps the
/// position it was first inserted at.
pub fn merge_layers(global: &Config, local: &Config, overrides: &Config) -> Config {
    let mut merged = global.clone();
    for layer in [local, overrides] {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Seed for the compile: override `@seed`, else global `@seed`, else 0.
pub fn sweep_seed(global: &Config, overrides: &Config) -> Result<u64, CompileError> {
    let key = Marker::Seed.key();
    match overrides.get(&key).or_else(|| global.get(&key)) {
        None => Ok(0),
        Some(Value::Integer(seed)) => Ok(*seed as u64),
        Some(other) => Err(CompileError::invalid_value(
            &key,
            format!("seed must be an integer, got {other}"),
        )),
    }
}
