//! Configuration management.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `./doi-finder.toml` or `<config_dir>/doi-finder/config.toml`)
//! 3. Environment variables prefixed with `DOI_FINDER_`, using `__` between
//!    section and key (e.g. `DOI_FINDER_LOOKUP__MAILTO=me@example.org`)
//!
//! # Configuration File Format
//!
//! ```toml
//! [lookup]
//! endpoint = "https://api.crossref.org/works"
//! timeout_secs = 30
//! mailto = "me@example.org"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default CrossRef works endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.crossref.org/works";

/// Default per-request network timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CONFIG_FILE_NAME: &str = "doi-finder.toml";
const ENV_PREFIX: &str = "DOI_FINDER";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metadata lookup settings
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lookup service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Works search endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Network timeout per request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Contact address for CrossRef's polite pool (sent in the User-Agent)
    #[serde(default)]
    pub mailto: Option<String>,

    /// Full User-Agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            mailto: None,
            user_agent: None,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// User-Agent sent with every request.
    pub fn user_agent(&self) -> String {
        if let Some(agent) = &self.user_agent {
            return agent.clone();
        }
        match &self.mailto {
            Some(mailto) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                mailto
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.lookup.endpoint)
            .map_err(|e| ConfigError::Invalid(format!("lookup.endpoint: {}", e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "lookup.endpoint: unsupported scheme '{}'",
                endpoint.scheme()
            )));
        }
        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "lookup.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration from environment variables and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder().add_source(env_source()).build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Look for a configuration file in the working directory, then in the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    default_config_path().filter(|path| path.is_file())
}

/// `<config_dir>/doi-finder/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("doi-finder").join("config.toml"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lookup.endpoint, "https://api.crossref.org/works");
        assert_eq!(config.lookup.timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_agent() {
        let mut lookup = LookupConfig::default();
        assert!(lookup.user_agent().starts_with("doi-finder/"));

        lookup.mailto = Some("me@example.org".to_string());
        assert!(lookup.user_agent().ends_with("(mailto:me@example.org)"));

        lookup.user_agent = Some("custom/1.0".to_string());
        assert_eq!(lookup.user_agent(), "custom/1.0");
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
[lookup]
endpoint = "http://localhost:8080/works"
timeout_secs = 5
mailto = "team@example.org"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.lookup.endpoint, "http://localhost:8080/works");
        assert_eq!(config.lookup.timeout_secs, 5);
        assert_eq!(config.lookup.mailto.as_deref(), Some("team@example.org"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.lookup, LookupConfig::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.lookup.mailto = Some("saved@example.org".to_string());
        config.save(&path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.lookup.mailto.as_deref(), Some("saved@example.org"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.lookup.endpoint = "ftp://example.org/works".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.lookup.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.lookup.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Path::new("/nonexistent/doi-finder.toml"));
        assert!(result.is_err());
    }
}
