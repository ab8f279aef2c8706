use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub display: DisplayConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the AnalyticsFlow API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to the file holding the bearer token.
    /// Defaults to `<config dir>/token` when unset.
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Glyph rendered for a missing statistic value
    pub placeholder: String,
    /// Format string for the dataset upload date
    pub timestamp_format: String,
    /// Open the chat panel on startup
    pub chat_open: bool,
    /// Event loop poll interval in milliseconds
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

// Default implementations
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            display: DisplayConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            placeholder: "-".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
            chat_open: false,
            event_poll_interval_ms: 25,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(user_config) = Self::load_user_config(app_name) {
            config.merge(user_config);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific config directory (primarily for testing)
    pub fn load_from_dir(config_dir: &Path) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = config_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                eyre!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            let user_config: AppConfig = toml::from_str(&content).map_err(|e| {
                eyre!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            config.merge(user_config);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load user configuration from ~/.config/anaflow/config.toml
    fn load_user_config(app_name: &str) -> Result<AppConfig> {
        let config_manager = ConfigManager::new(app_name)?;
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.server.merge(other.server);
        self.session.merge(other.session);
        self.display.merge(other.display);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(eyre!("server.base_url must not be empty"));
        }
        if self.server.timeout_secs == 0 {
            return Err(eyre!("server.timeout_secs must be greater than zero"));
        }
        if self.display.placeholder.is_empty() {
            return Err(eyre!("display.placeholder must not be empty"));
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ServerConfig::default();
        if other.base_url != default.base_url {
            self.base_url = other.base_url;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

impl SessionConfig {
    pub fn merge(&mut self, other: Self) {
        if other.token_file.is_some() {
            self.token_file = other.token_file;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.placeholder != default.placeholder {
            self.placeholder = other.placeholder;
        }
        if other.timestamp_format != default.timestamp_format {
            self.timestamp_format = other.timestamp_format;
        }
        if other.chat_open != default.chat_open {
            self.chat_open = other.chat_open;
        }
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_template_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_merge_keeps_defaults_for_unset_fields() {
        let mut config = AppConfig::default();
        let partial: AppConfig = toml::from_str(
            r#"
            [server]
            base_url = "https://analytics.example.com"
            "#,
        )
        .unwrap();
        config.merge(partial);

        assert_eq!(config.server.base_url, "https://analytics.example.com");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.display.placeholder, "-");
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let mut config = AppConfig::default();
        config.server.base_url = " ".to_string();
        assert!(config.validate().is_err());
    }
}
