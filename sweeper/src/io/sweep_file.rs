//! Sweep file loading and command-line overrides.
//!
//! Sweep files are TOML or JSON documents with `@global` and `@jobs` at the
//! top level. Key order is preserved, since it drives expansion order and
//! flag order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use crate::core::raw::RawConfig;
use crate::core::value::{Config, Value};

/// On-disk encoding of a sweep file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepFormat {
    Toml,
    Json,
}

impl SweepFormat {
    /// Pick the format from the file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SweepFormat::Json,
            _ => SweepFormat::Toml,
        }
    }
}

/// Load and interpret a sweep file.
pub fn load_sweep_file(path: &Path) -> Result<RawConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read sweep {}", path.display()))?;
    let format = SweepFormat::from_path(path);
    debug!(path = %path.display(), ?format, "loading sweep file");
    parse_sweep_str(&contents, format).with_context(|| format!("load sweep {}", path.display()))
}

pub fn parse_sweep_str(contents: &str, format: SweepFormat) -> Result<RawConfig> {
    let document: Value = match format {
        SweepFormat::Toml => toml::from_str(contents).context("parse toml")?,
        SweepFormat::Json => serde_json::from_str(contents).context("parse json")?,
    };
    Ok(RawConfig::from_value(document)?)
}

#[derive(Deserialize)]
struct OverrideDoc {
    value: Value,
}

/// Parse one `KEY=VALUE` override.
///
/// VALUE is read as a TOML value (`3`, `0.5`, `[1, 2]`, `"quoted"`); anything
/// that does not parse is taken as a bare string.
pub fn parse_override(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("override {raw:?} must have the form KEY=VALUE");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("override {raw:?} has an empty key");
    }
    let value = match toml::from_str::<OverrideDoc>(&format!("value = {value}")) {
        Ok(doc) => doc.value,
        Err(_) => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Parse overrides in order; a repeated key keeps the last value.
pub fn parse_overrides<S: AsRef<str>>(items: &[S]) -> Result<Config> {
    let mut overrides = Config::new();
    for item in items {
        let (key, value) = parse_override(item.as_ref())?;
        overrides.insert(key, value);
    }
    Ok(overrides)
}
