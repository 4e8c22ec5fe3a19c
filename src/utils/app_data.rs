use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "ldbview";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "ldbview.log";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Quiet period after the last keystroke before a search runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Record count at which filtering switches to the rayon thread pool
    #[serde(default = "default_parallel_filter_threshold")]
    pub parallel_filter_threshold: usize,

    /// Number of filter results remembered per opened database
    #[serde(default = "default_search_cache_size")]
    pub search_cache_size: usize,

    /// Start the TUI showing hex instead of decoded text
    #[serde(default)]
    pub show_hex: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_parallel_filter_threshold() -> usize {
    4096
}

fn default_search_cache_size() -> usize {
    64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            parallel_filter_threshold: default_parallel_filter_threshold(),
            search_cache_size: default_search_cache_size(),
            show_hex: false,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a config document; absent fields take their defaults
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config file")
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the path of the log file used while the TUI owns the terminal
pub fn get_log_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(LOG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
