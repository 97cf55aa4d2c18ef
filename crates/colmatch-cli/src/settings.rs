//! Settings file support.
//!
//! Settings are read from an optional TOML file:
//!
//! ```toml
//! [learning]
//! data_dir = "./data"
//! learning_rate = 0.01
//! weight_batch_size = 10
//! learning_queue_capacity = 1024
//!
//! [matching]
//! min_confidence = 10.0
//! ```
//!
//! Missing sections and keys fall back to their defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colmatch_learn::LearningConfig;
use colmatch_map::MatchOptions;
use serde::{Deserialize, Serialize};

/// Combined learning and matching settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub learning: LearningConfig,
    pub matching: MatchOptions,
}

/// Load settings from `path`.
///
/// Returns default settings if no path is given, the file doesn't exist or
/// it cannot be parsed.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {}, using defaults", e);
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No settings file found at {:?}, using defaults", path);
            Settings::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read settings file: {}, using defaults", e);
            Settings::default()
        }
    }
}

/// Write settings as TOML, creating the parent directory if needed.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, content).with_context(|| format!("write settings {}", path.display()))?;
    tracing::info!("Saved settings to {:?}", path);
    Ok(())
}
