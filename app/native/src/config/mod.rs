//! Configuration module for Paneltint.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! A missing file is not an error; every option has a default.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/paneltint/config.jsonc \
         or ~/.config/paneltint/config.json"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Paneltint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TintConfig {
    /// Restrict transitions to a single panel id.
    /// Absent or empty: every panel in the panel list is updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<String>,

    /// Path of a JSON settings document to drive instead of the live
    /// `gsettings` database. Tilde expansion applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<String>,

    /// Default log filter (e.g. `"info"` or `"paneltint=debug"`).
    /// The `RUST_LOG` environment variable takes precedence when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<TintConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// `$XDG_CONFIG_HOME/paneltint/` is checked first when the variable is set,
/// then `~/.config/paneltint/`, each with the `.jsonc` and `.json` variants.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(xdg_config).join("paneltint");
        for filename in CONFIG_FILE_NAMES {
            paths.push(dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let dir = home.join(".config").join("paneltint");
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME might already be ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if no configuration file exists,
/// [`ConfigError::Io`] if one exists but cannot be read, and
/// [`ConfigError::Parse`] if it contains invalid JSON.
pub fn load_config() -> Result<(TintConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            let file = fs::File::open(&path)?;
            // Strip comments from JSONC before parsing
            let reader = json_comments::StripComments::new(file);
            let config: TintConfig = serde_json::from_reader(reader)?;
            return Ok((config, path));
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration, falling back to defaults on any failure.
fn load_or_default() -> TintConfig {
    match load_config() {
        Ok((config, path)) => {
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => TintConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            TintConfig::default()
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// Idempotent; repeated calls return the same instance.
pub fn init() -> &'static TintConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the global configuration, initializing it if necessary.
pub fn get_config() -> &'static TintConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }
