//! Connection configuration.

use std::time::Duration;

/// Immutable configuration for one channel session.
///
/// Created once at startup and handed to the protocol connection by
/// constructor injection; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Platform domain, with or without an `https://` prefix.
    pub domain: String,
    /// Channel name to join.
    pub channel: String,
    /// Optional channel password.
    pub channel_password: Option<String>,
    /// Account name; `None` means an anonymous session.
    pub username: Option<String>,
    /// Account password; `None` with a username means a guest login.
    pub password: Option<String>,
    /// Deadline for every request awaiting an acknowledgment.
    pub response_timeout: Duration,
    /// First reconnect delay.
    pub base_reconnect_delay: Duration,
    /// Reconnect delay cap.
    pub max_reconnect_delay: Duration,
    /// Reconnect attempt cap (`None` = retry forever).
    pub max_reconnect_attempts: Option<u32>,
}

impl ConnectionConfig {
    /// Creates a config for the given domain and channel with default timing.
    pub fn new(domain: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            channel: channel.into(),
            channel_password: None,
            username: None,
            password: None,
            response_timeout: Duration::from_secs(3),
            base_reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(60),
            max_reconnect_attempts: None,
        }
    }

    /// Sets the channel password.
    pub fn with_channel_password(mut self, password: impl Into<String>) -> Self {
        self.channel_password = Some(password.into());
        self
    }

    /// Sets account credentials. Omitting the password logs in as a guest.
    pub fn with_account(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// Sets the acknowledgment deadline.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the reconnect delay range.
    pub fn with_reconnect_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_reconnect_delay = base;
        self.max_reconnect_delay = max;
        self
    }

    /// Caps the number of consecutive reconnect attempts.
    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timing() {
        let config = ConnectionConfig::new("cytu.be", "lobby");
        assert_eq!(config.response_timeout, Duration::from_secs(3));
        assert_eq!(config.base_reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(60));
        assert!(config.max_reconnect_attempts.is_none());
        assert!(config.username.is_none());
    }

    #[test]
    fn builders_layer_onto_defaults() {
        let config = ConnectionConfig::new("cytu.be", "lobby")
            .with_account("rosey", Some("hunter2".into()))
            .with_channel_password("sesame")
            .with_max_reconnect_attempts(8);
        assert_eq!(config.username.as_deref(), Some("rosey"));
        assert_eq!(config.channel_password.as_deref(), Some("sesame"));
        assert_eq!(config.max_reconnect_attempts, Some(8));
    }
}
