//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::CuebotConfig;

/// Validates a loaded configuration.
///
/// Catches the mistakes figment cannot: missing required fields and
/// value combinations the engine would only reject at connect time.
pub fn validate_config(config: &CuebotConfig) -> ConfigResult<()> {
    let conn = &config.connection;

    if conn.domain.trim().is_empty() {
        return Err(ConfigError::missing_field("connection.domain"));
    }
    if conn.channel.trim().is_empty() {
        return Err(ConfigError::missing_field("connection.channel"));
    }
    if conn.username.is_none() && conn.password.is_some() {
        return Err(ConfigError::validation(
            "connection.password is set but connection.username is not",
        ));
    }
    if conn.response_timeout_secs <= 0.0 {
        return Err(ConfigError::validation(
            "connection.response_timeout_secs must be positive",
        ));
    }
    if conn.base_reconnect_delay_secs <= 0.0 || conn.max_reconnect_delay_secs <= 0.0 {
        return Err(ConfigError::validation(
            "reconnect delays must be positive",
        ));
    }
    if conn.base_reconnect_delay_secs > conn.max_reconnect_delay_secs {
        return Err(ConfigError::validation(
            "connection.base_reconnect_delay_secs exceeds connection.max_reconnect_delay_secs",
        ));
    }
    if let Some(0) = conn.max_reconnect_attempts {
        return Err(ConfigError::validation(
            "connection.max_reconnect_attempts must be at least 1 when set",
        ));
    }
    if config.bot.command_prefix.is_empty() {
        return Err(ConfigError::validation("bot.command_prefix is empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ConnectionSection;

    fn valid() -> CuebotConfig {
        CuebotConfig {
            connection: ConnectionSection {
                domain: "cytu.be".into(),
                channel: "lobby".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_minimal_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn requires_domain_and_channel() {
        let mut config = valid();
        config.connection.domain.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "connection.domain"
        ));

        let mut config = valid();
        config.connection.channel = "   ".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_password_without_username() {
        let mut config = valid();
        config.connection.password = Some("hunter2".into());
        assert!(validate_config(&config).is_err());

        config.connection.username = Some("rosey".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_degenerate_timing() {
        let mut config = valid();
        config.connection.response_timeout_secs = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.connection.base_reconnect_delay_secs = 90.0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.connection.max_reconnect_attempts = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_an_empty_command_prefix() {
        let mut config = valid();
        config.bot.command_prefix.clear();
        assert!(validate_config(&config).is_err());
    }
}
