use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::check::CheckOptions;
use crate::compare::CompareOptions;

const CONFIG_FILE: &str = "ipmd-check.json";

/// Top-level configuration for the ipmd-check tool.
///
/// Controls how images are checked, how two check outputs are compared,
/// and what the CLI prints.
///
/// # Loading
///
/// ```rust,no_run
/// use ipmd_check::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.check.compare_formats = true;
/// config.compare.merge_formats = true;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format comparison and "any other data" tags.
    pub check: CheckOptions,
    /// Property filter, row merging and missing-property policy.
    pub compare: CompareOptions,
    pub output: OutputConfig,
}

/// Output behavior of the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print discrepancies as JSON instead of a table.
    pub json: bool,
    /// Include the state tree when printing a check result.
    pub include_state: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            include_state: true,
        }
    }
}

impl Config {
    /// Resolve the config file path: `ipmd-check.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join(CONFIG_FILE))
    }

    fn resolve(path: Option<&Path>) -> Result<PathBuf> {
        path.map_or_else(Self::config_path, |p| Ok(p.to_path_buf()))
    }

    /// Load config from the given path, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve(path)?;
        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Save config to the given path, or to the default location. Returns
    /// the path written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = Self::resolve(path)?;
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file {}", config_path.display()))?;
        log::info!("Config saved to {}", config_path.display());
        Ok(config_path)
    }
}
