//! Deterministic, pure logic of the sweep compiler.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! configurations and return deterministic outputs suitable for tests; the
//! only randomness comes from an explicitly seeded [`expand::SampleSource`].

pub mod command;
pub mod directive;
pub mod error;
pub mod expand;
pub mod job;
pub mod raw;
pub mod resolve;
pub mod value;
