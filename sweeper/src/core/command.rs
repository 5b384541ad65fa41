//! Command-line synthesis from a resolved configuration.

use crate::core::directive::{Marker, parse_key};
use crate::core::error::CompileError;
use crate::core::value::{Config, Value};

/// Reserved `@log_path` value that sends job output to the console.
pub const CONSOLE_LOG_PATH: &str = "stdout";

/// `chrono` format for the timestamp stem of the default `@log_path`.
pub const DEFAULT_LOG_PATH_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

const DEFAULT_LOAD: f64 = 1.0;
const DEFAULT_PRIORITY: f64 = 0.0;

/// How plain flags are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFormat {
    /// ` --name value`
    Flag,
    /// ` name=value`
    Equals,
}

impl FlagFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "flag" => Some(FlagFormat::Flag),
            "=" => Some(FlagFormat::Equals),
            _ => None,
        }
    }
}

/// Output of [`compile_command`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCommand {
    pub command: String,
    pub load: f64,
    pub priority: f64,
    pub log_path: String,
    /// Configuration left after reserved keys were extracted.
    pub remaining: Config,
}

/// Extract reserved keys and render the remaining flags as a command line.
///
/// `default_log_path` is used when `@log_path` is absent; `job` labels errors.
pub fn compile_command(
    resolved: &Config,
    default_log_path: &str,
    job: &str,
) -> Result<CompiledCommand, CompileError> {
    let mut remaining = resolved.clone();

    let program = remaining
        .shift_remove(&Marker::Program.key())
        .ok_or_else(|| CompileError::MissingProgram {
            job: job.to_string(),
        })?
        .to_string();
    let format = match remaining.shift_remove(&Marker::Format.key()) {
        None => FlagFormat::Flag,
        Some(value) => {
            let raw = value.to_string();
            FlagFormat::parse(&raw).ok_or_else(|| CompileError::UnknownFormat {
                job: job.to_string(),
                format: raw,
            })?
        }
    };
    let load = take_number(&mut remaining, Marker::Load, DEFAULT_LOAD)?;
    let priority = take_number(&mut remaining, Marker::Priority, DEFAULT_PRIORITY)?;
    let log_path = remaining
        .shift_remove(&Marker::LogPath.key())
        .map(|value| value.to_string())
        .unwrap_or_else(|| default_log_path.to_string());

    let command = render_flags(program, format, &remaining);
    Ok(CompiledCommand {
        command,
        load,
        priority,
        log_path,
        remaining,
    })
}

fn take_number(config: &mut Config, marker: Marker, default: f64) -> Result<f64, CompileError> {
    let key = marker.key();
    let Some(value) = config.shift_remove(&key) else {
        return Ok(default);
    };
    let number = match &value {
        Value::String(text) => text.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    number.ok_or_else(|| {
        CompileError::invalid_value(&key, format!("expected a number, got {value}"))
    })
}

fn render_flags(program: String, format: FlagFormat, flags: &Config) -> String {
    let mut command = program;
    for (key, value) in flags {
        let parsed = parse_key(key);
        let name = &parsed.base_name;
        if name.is_empty() {
            continue;
        }
        if parsed.has(Marker::Env) {
            command = format!("{name}={value} {command}");
        } else if parsed.has(Marker::Gin) {
            command.push_str(&format!(" --gin_param='{name} = {value}'"));
        } else {
            match format {
                FlagFormat::Flag => command.push_str(&format!(" --{name} {value}")),
                FlagFormat::Equals => command.push_str(&format!(" {name}={value}")),
            }
        }
    }
    command
}
