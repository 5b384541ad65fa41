//! I/O helpers: sweep files, settings, and job execution.

pub mod concurrent;
pub mod config;
pub mod process;
pub mod sweep_file;
