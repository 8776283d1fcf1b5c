//! Configuration module for the cuebot runtime.
//!
//! Layered loading with figment: built-in defaults, then a TOML file
//! (`cuebot.toml` / `config.toml`), then `CUEBOT_`-prefixed environment
//! variables, followed by a validation pass.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    BotSection, ConnectionSection, CuebotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
};
pub use validation::validate_config;
