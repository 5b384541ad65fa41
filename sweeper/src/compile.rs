//! Orchestration for compiling a sweep into job descriptors.
//!
//! Ties the core stages together: layer merging, seeded expansion, reference
//! resolution and command synthesis. Configuration errors abort the whole
//! compile; reference non-termination is reported per job so the caller can
//! choose between aborting and skipping.

use chrono::{DateTime, Local};
use tracing::{debug, info, instrument, warn};

use crate::core::command::{DEFAULT_LOG_PATH_FORMAT, compile_command};
use crate::core::error::CompileError;
use crate::core::expand::{SampleSource, expand};
use crate::core::job::{JobDescriptor, job_label};
use crate::core::raw::{RawConfig, merge_layers, sweep_seed};
use crate::core::resolve::{DEFAULT_REFERENCE_BUDGET, resolve_references};
use crate::core::value::Config;

/// Knobs for a single compile.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Queue pops allowed per configuration during reference resolution.
    pub reference_budget: usize,
    /// Timestamp the default `@log_path` is derived from.
    pub timestamp: DateTime<Local>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            reference_budget: DEFAULT_REFERENCE_BUDGET,
            timestamp: Local::now(),
        }
    }
}

impl CompileOptions {
    /// Default `@log_path` for one job: the compile timestamp followed by the
    /// job's entry and combination index, so no two jobs share a file.
    pub fn default_log_path(&self, entry: usize, combination: usize) -> String {
        format!(
            "{}-{entry}-{combination}.log",
            self.timestamp.format(DEFAULT_LOG_PATH_FORMAT)
        )
    }
}

/// Compile every job, keeping per-job resolution failures separate.
///
/// The outer error is a configuration error that invalidates the whole
/// sweep. Each inner `Err` is a [`CompileError::NonTermination`] for one job.
#[instrument(skip_all, fields(entries = raw.jobs.len()))]
pub fn compile_each(
    raw: &RawConfig,
    overrides: &Config,
    options: &CompileOptions,
) -> Result<Vec<Result<JobDescriptor, CompileError>>, CompileError> {
    let seed = sweep_seed(&raw.global, overrides)?;
    let mut source = SampleSource::from_seed(seed);

    let mut outcomes = Vec::new();
    for (entry, local) in raw.jobs.iter().enumerate() {
        let merged = merge_layers(&raw.global, local, overrides);
        let concrete = expand(&merged, &mut source)?;
        debug!(entry, combinations = concrete.len(), "expanded job entry");

        for (combination, full_config) in concrete.into_iter().enumerate() {
            let label = job_label(entry, combination);
            let resolved = match resolve_references(&full_config, options.reference_budget) {
                Ok(resolved) => resolved,
                Err(unconverged) => {
                    warn!(job = %label, keys = ?unconverged.keys, "reference resolution did not converge");
                    outcomes.push(Err(CompileError::NonTermination {
                        job: label,
                        keys: unconverged.keys,
                        budget: unconverged.budget,
                    }));
                    continue;
                }
            };
            let default_log_path = options.default_log_path(entry, combination);
            let compiled = compile_command(&resolved, &default_log_path, &label)?;
            debug!(job = %label, command = %compiled.command, "compiled job");
            outcomes.push(Ok(JobDescriptor {
                label,
                priority: compiled.priority,
                load: compiled.load,
                command: compiled.command,
                log_path: compiled.log_path,
                full_config,
                resolved_config: compiled.remaining,
            }));
        }
    }
    info!(seed, jobs = outcomes.len(), "compiled sweep");
    Ok(outcomes)
}

/// Compile every job, failing on the first error of any kind.
pub fn compile_jobs(
    raw: &RawConfig,
    overrides: &Config,
    options: &CompileOptions,
) -> Result<Vec<JobDescriptor>, CompileError> {
    compile_each(raw, overrides, options)?.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use crate::test_support::{config, fixed_options, raw_config};

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn end_to_end_sweep_compiles_in_list_order() {
        let raw = raw_config(
            config(&[("@program", "echo".into()), ("@format", "flag".into())]),
            vec![config(&[("@sweep.x", ints(&[1, 2])), ("msg", "val=@x".into())])],
        );
        let jobs = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        let commands: Vec<&str> = jobs.iter().map(|job| job.command.as_str()).collect();
        assert_eq!(commands, vec!["echo --x 1 --msg val=1", "echo --x 2 --msg val=2"]);
        assert_eq!(jobs[0].label, "jobs[0]#0");
        assert_eq!(jobs[1].label, "jobs[0]#1");
    }

    #[test]
    fn no_sweep_yields_exactly_one_job_per_entry() {
        let raw = raw_config(
            config(&[("@program", "run".into())]),
            vec![config(&[("a", Value::Integer(1))]), config(&[("b", Value::Integer(2))])],
        );
        let jobs = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].command, "run --a 1");
        assert_eq!(jobs[1].command, "run --b 2");
    }

    #[test]
    fn job_count_is_product_of_cardinalities() {
        let raw = raw_config(
            config(&[("@program", "run".into())]),
            vec![config(&[
                ("@sweep.a", ints(&[1, 2, 3])),
                ("@sweep.b", ints(&[1, 2])),
                (
                    "@uniform.c",
                    Value::List(vec![Value::Float(0.0), Value::Float(1.0), Value::Integer(2)]),
                ),
            ])],
        );
        let jobs = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        assert_eq!(jobs.len(), 12);
    }

    #[test]
    fn overrides_replace_job_values() {
        let raw = raw_config(
            config(&[("@program", "run".into()), ("lr", Value::Float(0.1))]),
            vec![config(&[("lr", Value::Float(0.2))])],
        );
        let overrides = config(&[("lr", Value::Float(0.3))]);
        let jobs = compile_jobs(&raw, &overrides, &fixed_options()).expect("compile");
        assert_eq!(jobs[0].command, "run --lr 0.3");
    }

    #[test]
    fn same_seed_compiles_identical_job_lists() {
        let raw = raw_config(
            config(&[("@program", "run".into()), ("@seed", Value::Integer(5))]),
            vec![config(&[(
                "@loguniform.lr",
                Value::List(vec![Value::Float(1e-4), Value::Float(1e-1), Value::Integer(3)]),
            )])],
        );
        let first = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        let second = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        assert_eq!(first, second);

        let reseeded = config(&[("@seed", Value::Integer(6))]);
        let third = compile_jobs(&raw, &reseeded, &fixed_options()).expect("compile");
        assert_ne!(first[0].command, third[0].command);
    }

    #[test]
    fn full_config_keeps_references_and_resolved_drops_reserved_keys() {
        let raw = raw_config(
            config(&[("@program", "run".into())]),
            vec![config(&[("a", Value::Integer(1)), ("b", "@a!".into())])],
        );
        let jobs = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        assert_eq!(jobs[0].full_config["b"], Value::from("@a!"));
        assert_eq!(jobs[0].resolved_config["b"], Value::from("1!"));
        assert!(!jobs[0].resolved_config.contains_key("@program"));
    }

    #[test]
    fn default_log_path_comes_from_timestamp() {
        let raw = raw_config(config(&[("@program", "run".into())]), vec![Config::new()]);
        let options = fixed_options();
        let jobs = compile_jobs(&raw, &Config::new(), &options).expect("compile");
        assert_eq!(jobs[0].log_path, "2024-01-02-03-04-05-0-0.log");
        assert_eq!(jobs[0].log_path, options.default_log_path(0, 0));
    }

    #[test]
    fn default_log_paths_are_unique_per_job() {
        let raw = raw_config(
            config(&[("@program", "run".into())]),
            vec![
                config(&[("@sweep.x", ints(&[1, 2]))]),
                config(&[("y", Value::Integer(3))]),
            ],
        );
        let jobs = compile_jobs(&raw, &Config::new(), &fixed_options()).expect("compile");
        let paths: Vec<&str> = jobs.iter().map(|job| job.log_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "2024-01-02-03-04-05-0-0.log",
                "2024-01-02-03-04-05-0-1.log",
                "2024-01-02-03-04-05-1-0.log",
            ]
        );
    }

    #[test]
    fn cycle_is_reported_per_job() {
        let raw = raw_config(
            config(&[("@program", "run".into())]),
            vec![
                config(&[("a", "x@b".into()), ("b", "y@a".into())]),
                config(&[("ok", Value::Integer(1))]),
            ],
        );
        let outcomes = compile_each(&raw, &Config::new(), &fixed_options()).expect("compile");
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0],
            Err(CompileError::NonTermination { ref job, .. }) if job == "jobs[0]#0"
        ));
        assert!(outcomes[1].is_ok());

        let err = compile_jobs(&raw, &Config::new(), &fixed_options()).expect_err("cycle");
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn missing_program_fails_whole_compile() {
        let raw = raw_config(Config::new(), vec![config(&[("a", Value::Integer(1))])]);
        let err = compile_each(&raw, &Config::new(), &fixed_options()).expect_err("no program");
        assert!(matches!(err, CompileError::MissingProgram { .. }));
    }
}
