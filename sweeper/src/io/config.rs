//! Tool settings stored in `sweeper.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::command::CONSOLE_LOG_PATH;
use crate::core::resolve::DEFAULT_REFERENCE_BUDGET;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "sweeper.toml";

/// Sweeper settings (TOML).
///
/// Missing fields fall back to defaults, so an empty or absent file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweeperConfig {
    /// Queue pops allowed per job while resolving `@name` references.
    pub reference_budget: usize,

    /// Shell used to run job commands (`<shell> -c <command>`).
    pub shell: String,

    /// `@log_path` value that sends job stdout to the console.
    pub console_log_path: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            reference_budget: DEFAULT_REFERENCE_BUDGET,
            shell: "sh".to_string(),
            console_log_path: CONSOLE_LOG_PATH.to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reference_budget == 0 {
            return Err(anyhow!("reference_budget must be > 0"));
        }
        if self.shell.trim().is_empty() {
            return Err(anyhow!("shell must be non-empty"));
        }
        if self.console_log_path.is_empty() {
            return Err(anyhow!("console_log_path must be non-empty"));
        }
        Ok(())
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `SweeperConfig::default()`.
pub fn load_config(path: &Path) -> Result<SweeperConfig> {
    if !path.exists() {
        let cfg = SweeperConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SweeperConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
