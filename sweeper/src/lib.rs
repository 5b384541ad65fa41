//! Experiment-sweep compiler and job runner.
//!
//! A sweep is a hierarchical configuration whose keys may carry `@` directives
//! (`@sweep`, `@uniform`, `@loguniform`, `@env`, `@gin`, ...). Compilation
//! expands it into the cartesian product of its swept values, resolves
//! `@name` references between keys, and synthesizes one shell command per
//! job. The crate is split into:
//!
//! - **[`core`]**: Pure compilation stages (directive parsing, expansion,
//!   reference resolution, command synthesis). Deterministic for a fixed seed.
//! - **[`io`]**: Sweep files, settings, and subprocess execution in blocking
//!   and cooperative-concurrent modes.
//!
//! [`compile`] wires the core stages together; [`cli`] implements the binary's
//! commands on top of both.

pub mod cli;
pub mod compile;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
