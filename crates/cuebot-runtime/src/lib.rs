//! # cuebot-runtime
//!
//! The embedding layer around the connection engine: layered
//! configuration loading (defaults → TOML file → `CUEBOT_` environment
//! variables) and `tracing` subscriber setup. Nothing here touches the
//! protocol; it only produces the [`ConnectionConfig`](cuebot_core::ConnectionConfig)
//! and logging environment the engine runs in.

pub mod config;
pub mod logging;

pub use config::{
    BotSection, ConfigError, ConfigLoader, ConfigResult, ConnectionSection, CuebotConfig,
    LoggingConfig, load_config, load_config_from_file, validate_config,
};
pub use logging::{LoggingBuilder, init_from_config};
