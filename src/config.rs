use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the enMedD AI backend (no trailing slash needed)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional API key, sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("enmedd-admin/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Revalidation intervals for the remote data cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Interval in seconds between listing refreshes (default: 300)
    #[serde(default = "default_revalidate_interval")]
    pub revalidate_interval_secs: u64,
    /// Interval in seconds between current search settings polls (default: 5)
    #[serde(default = "default_search_settings_poll")]
    pub search_settings_poll_secs: u64,
    /// Interval in seconds between backend health checks (default: 60)
    #[serde(default = "default_health_poll")]
    pub health_poll_secs: u64,
}

fn default_revalidate_interval() -> u64 {
    300 // 5 minutes
}

fn default_search_settings_poll() -> u64 {
    5
}

fn default_health_poll() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            revalidate_interval_secs: default_revalidate_interval(),
            search_settings_poll_secs: default_search_settings_poll(),
            health_poll_secs: default_health_poll(),
        }
    }
}

impl CacheConfig {
    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_secs(self.revalidate_interval_secs.max(1))
    }

    pub fn search_settings_poll(&self) -> Duration {
        Duration::from_secs(self.search_settings_poll_secs.max(1))
    }

    pub fn health_poll(&self) -> Duration {
        Duration::from_secs(self.health_poll_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Rows per listing page (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Seconds a transient notification stays visible (default: 5)
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl_secs: u64,
}

fn default_page_size() -> usize {
    10
}

fn default_notification_ttl() -> u64 {
    5
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            notification_ttl_secs: default_notification_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file instead of stderr
    #[serde(default)]
    pub to_file: bool,

    /// Directory for log files (default: platform data dir)
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            dir: None,
        }
    }
}

impl Config {
    /// Path to the user config file (~/.config/enmedd-admin/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("enmedd-admin").join("config.toml"))
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the client works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. ENMEDD_ADMIN__API__BASE_URL
        builder = builder.add_source(
            config::Environment::with_prefix("ENMEDD_ADMIN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to the user config path
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::user_config_path().context("No config directory on this platform")?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory log files are written to
    pub fn logs_path(&self) -> PathBuf {
        match &self.logging.dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("enmedd-admin")
                .join("logs"),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.ui.notification_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.cache.revalidate_interval_secs, 300);
        assert_eq!(config.cache.search_settings_poll_secs, 5);
        assert_eq!(config.ui.page_size, 10);
        assert!(!config.logging.to_file);
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("admin.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://enmedd.example.com\"\n\n[ui]\npage_size = 25\n",
        )
        .unwrap();

        let config = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.api.base_url, "https://enmedd.example.com");
        assert_eq!(config.ui.page_size, 25);
        // untouched sections keep their defaults
        assert_eq!(config.cache.health_poll_secs, 60);
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.api_key = Some("secret".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.api.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_intervals_never_zero() {
        let mut config = Config::default();
        config.cache.search_settings_poll_secs = 0;
        assert_eq!(config.cache.search_settings_poll(), Duration::from_secs(1));
    }
}
