//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use cuebot_core::ConnectionConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CuebotConfig {
    /// Channel connection settings.
    #[serde(default)]
    pub connection: ConnectionSection,

    /// Dispatcher settings.
    #[serde(default)]
    pub bot: BotSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Channel connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSection {
    /// Platform domain, with or without an `https://` prefix.
    #[serde(default)]
    pub domain: String,

    /// Channel name to join.
    #[serde(default)]
    pub channel: String,

    /// Optional channel password.
    #[serde(default)]
    pub channel_password: Option<String>,

    /// Account name; omit for an anonymous session.
    #[serde(default)]
    pub username: Option<String>,

    /// Account password; a username without one logs in as a guest.
    #[serde(default)]
    pub password: Option<String>,

    /// Deadline for requests awaiting an acknowledgment, in seconds.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: f64,

    /// First reconnect delay, in seconds.
    #[serde(default = "default_base_reconnect_delay_secs")]
    pub base_reconnect_delay_secs: f64,

    /// Reconnect delay cap, in seconds.
    #[serde(default = "default_max_reconnect_delay_secs")]
    pub max_reconnect_delay_secs: f64,

    /// Reconnect attempt cap; omit to retry forever.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            domain: String::new(),
            channel: String::new(),
            channel_password: None,
            username: None,
            password: None,
            response_timeout_secs: default_response_timeout_secs(),
            base_reconnect_delay_secs: default_base_reconnect_delay_secs(),
            max_reconnect_delay_secs: default_max_reconnect_delay_secs(),
            max_reconnect_attempts: None,
        }
    }
}

impl ConnectionSection {
    /// Converts to the core connection config.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.domain.clone(), self.channel.clone())
            .with_response_timeout(Duration::from_secs_f64(self.response_timeout_secs))
            .with_reconnect_delays(
                Duration::from_secs_f64(self.base_reconnect_delay_secs),
                Duration::from_secs_f64(self.max_reconnect_delay_secs),
            );
        if let Some(password) = &self.channel_password {
            config = config.with_channel_password(password.clone());
        }
        if let Some(username) = &self.username {
            config = config.with_account(username.clone(), self.password.clone());
        }
        if let Some(max) = self.max_reconnect_attempts {
            config = config.with_max_reconnect_attempts(max);
        }
        config
    }
}

fn default_response_timeout_secs() -> f64 {
    3.0
}

fn default_base_reconnect_delay_secs() -> f64 {
    5.0
}

fn default_max_reconnect_delay_secs() -> f64 {
    60.0
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSection {
    /// Command prefix.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
        }
    }
}

fn default_command_prefix() -> String {
    "!".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Extra filter directives, e.g. `["cuebot_protocol=debug"]`.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            filters: Vec::new(),
        }
    }
}

/// Log level (trace, debug, info, warn, error).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line output (default).
    #[default]
    Compact,
    /// Full formatter output.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}
