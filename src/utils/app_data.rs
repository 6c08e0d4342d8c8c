use crate::index::IndexConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "finja";
const CONFIG_FILE: &str = "config.json";

/// Divisor applied to the token cache budget by `--less-memory`.
pub const LESS_MEMORY_DIVISOR: usize = 100;

/// User configuration stored in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Number of cached token ids before the interner cache is cleared
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Directory names skipped in addition to the built-in set
    #[serde(default)]
    pub ignore_dirs: Vec<String>,

    /// File extensions skipped in addition to the built-in set
    #[serde(default)]
    pub ignore_extensions: Vec<String>,
}

fn default_cache_size() -> usize {
    1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            ignore_dirs: Vec::new(),
            ignore_extensions: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit file, defaulting when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Index settings with this config's additions applied
    pub fn index_config(&self, less_memory: bool) -> IndexConfig {
        let mut config = IndexConfig::default();

        config.cache_budget = if less_memory {
            self.cache_size / LESS_MEMORY_DIVISOR
        } else {
            self.cache_size
        };

        config
            .ignore_dirs
            .extend(self.ignore_dirs.iter().cloned());
        config.ignore_extensions.extend(
            self.ignore_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase()),
        );

        config
    }
}

/// Get the path to the config file, if the platform has a data directory
pub fn get_config_path() -> Option<PathBuf> {
    dirs::data_dir().map(|base| base.join(APP_NAME).join(CONFIG_FILE))
}
