//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`cuebot.toml` / `config.toml`, or an explicit path)
//! 3. Environment variables (`CUEBOT_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `CUEBOT_` prefix with `__` as the
//! section separator:
//!
//! - `CUEBOT_CONNECTION__CHANNEL=lobby` → `connection.channel = "lobby"`
//! - `CUEBOT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CUEBOT_BOT__COMMAND_PREFIX=~` → `bot.command_prefix = "~"`

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CuebotConfig;
use super::validation::validate_config;

/// File names searched when no explicit file is given.
const CONFIG_FILE_NAMES: &[&str] = &["cuebot.toml", "config.toml"];

/// Loads configuration from the default locations and validates it.
pub fn load_config() -> ConfigResult<CuebotConfig> {
    let config = ConfigLoader::new().load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads configuration from a specific file (plus env) and validates it.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CuebotConfig> {
    let config = ConfigLoader::new().file(path).load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Configuration loader with figment-based multi-source support.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("cuebot.toml")
///     .load()?;
/// ```
pub struct ConfigLoader {
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<CuebotConfig> {
        let figment = self.build_figment()?;
        let config: CuebotConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        debug!(
            domain = %config.connection.domain,
            channel = %config.connection.channel,
            logging_level = %config.logging.level,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CuebotConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else if let Some(path) = self.find_config_file() {
            info!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            warn!("no configuration file found, using defaults");
        }

        if self.load_env {
            figment = figment.merge(
                Env::prefixed("CUEBOT_")
                    .split("__")
                    .map(|key| key.as_str().replace("__", ".").into()),
            );
        }

        Ok(figment)
    }

    /// Searches the configured paths (or the current directory) for a
    /// config file.
    fn find_config_file(&self) -> Option<PathBuf> {
        let search_paths = if self.search_paths.is_empty() {
            std::env::current_dir().into_iter().collect()
        } else {
            self.search_paths.clone()
        };
        for search_path in &search_paths {
            for name in CONFIG_FILE_NAMES {
                let candidate = search_path.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn defaults_load_without_any_sources() {
        let config = ConfigLoader::new()
            .without_env()
            .search_path("/nonexistent")
            .load()
            .unwrap();

        assert_eq!(config.connection.response_timeout_secs, 3.0);
        assert_eq!(config.connection.base_reconnect_delay_secs, 5.0);
        assert_eq!(config.connection.max_reconnect_delay_secs, 60.0);
        assert_eq!(config.bot.command_prefix, "!");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/cuebot.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn file_layers_over_defaults() {
        let dir = std::env::temp_dir().join(format!("cuebot-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cuebot.toml");
        std::fs::write(
            &path,
            r#"
[connection]
domain = "cytu.be"
channel = "lobby"
response_timeout_secs = 7.5

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .search_path(&dir)
            .load()
            .unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.connection.domain, "cytu.be");
        assert_eq!(config.connection.response_timeout_secs, 7.5);
        // Untouched keys keep their defaults.
        assert_eq!(config.connection.base_reconnect_delay_secs, 5.0);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn environment_overrides_everything() {
        // SAFETY: single-threaded test, variables removed immediately after.
        unsafe {
            std::env::set_var("CUEBOT_CONNECTION__CHANNEL", "ops");
            std::env::set_var("CUEBOT_CONNECTION__MAX_RECONNECT_ATTEMPTS", "9");
        }
        let config = ConfigLoader::new().search_path("/nonexistent").load();
        unsafe {
            std::env::remove_var("CUEBOT_CONNECTION__CHANNEL");
            std::env::remove_var("CUEBOT_CONNECTION__MAX_RECONNECT_ATTEMPTS");
        }

        let config = config.unwrap();
        assert_eq!(config.connection.channel, "ops");
        assert_eq!(config.connection.max_reconnect_attempts, Some(9));
    }
}
