//! Application settings loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Process-wide settings, immutable after load.
///
/// The four mandatory fields (`API_ID`, `API_HASH`, `PHONE`, `CHANNEL`)
/// must all be present or [`Settings::from_env`] fails before any command
/// touches the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Phone number of the operator account, with country code.
    pub phone: String,

    /// Target channel, as `@username` or a bare username.
    pub channel: String,

    /// Bot token, required for bot-posting mode and the admin-log grant.
    pub bot_token: Option<String>,

    /// Username of the bot that receives admin rights in the log group.
    pub bot_username: Option<String>,

    /// Path to the user session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    /// Chat that receives moderation alerts.
    pub admin_log_chat: Option<String>,

    /// Prometheus listener address; metrics are disabled when unset.
    pub metrics_addr: Option<SocketAddr>,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("channel_ops.session")
}

impl Settings {
    /// Creates settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory key is missing or malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnvVar(key))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_id: i32 = require("API_ID")?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = require("API_HASH")?;
        let phone = require("PHONE")?;
        let channel = require("CHANNEL")?;

        let metrics_addr = match optional("METRICS_ADDR") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidMetricsAddr)?),
            None => None,
        };

        let session_path = optional("SESSION_NAME").map_or_else(default_session_path, |name| {
            PathBuf::from(format!("{name}.session"))
        });

        Ok(Self {
            api_id,
            api_hash,
            phone,
            channel,
            bot_token: optional("TG_BOT_TOKEN"),
            bot_username: optional("BOT_USERNAME"),
            session_path,
            admin_log_chat: optional("ADMIN_LOG_CHAT"),
            metrics_addr,
        })
    }

    /// Target channel with any leading `@` stripped.
    #[must_use]
    pub fn channel_username(&self) -> &str {
        self.channel.trim_start_matches('@')
    }

    /// Session path for the bot-token session, kept apart from the user one.
    #[must_use]
    pub fn bot_session_path(&self) -> PathBuf {
        self.session_path.with_file_name("channel_ops_bot.session")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid METRICS_ADDR (must be a socket address like 127.0.0.1:9100)")]
    InvalidMetricsAddr,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn mandatory() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("API_ID", "12345"),
            ("API_HASH", "abc123"),
            ("PHONE", "+1234567890"),
            ("CHANNEL", "@test_channel"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
    }

    #[test]
    fn test_mandatory_fields() {
        let settings = load(&mandatory()).unwrap();
        assert_eq!(settings.api_id, 12345);
        assert_eq!(settings.api_hash, "abc123");
        assert_eq!(settings.channel_username(), "test_channel");
        assert_eq!(settings.session_path, PathBuf::from("channel_ops.session"));
        assert!(settings.bot_token.is_none());
        assert!(settings.metrics_addr.is_none());
    }

    #[test]
    fn test_missing_mandatory_field() {
        let mut vars = mandatory();
        vars.remove("CHANNEL");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar("CHANNEL"))
        ));
    }

    #[test]
    fn test_invalid_api_id() {
        let mut vars = mandatory();
        vars.insert("API_ID", "not-a-number");

        assert!(matches!(load(&vars), Err(ConfigError::InvalidApiId)));
    }

    #[test]
    fn test_session_name_override() {
        let mut vars = mandatory();
        vars.insert("SESSION_NAME", "ops_test");

        let settings = load(&vars).unwrap();
        assert_eq!(settings.session_path, PathBuf::from("ops_test.session"));
    }

    #[test]
    fn test_metrics_addr_parse() {
        let mut vars = mandatory();
        vars.insert("METRICS_ADDR", "127.0.0.1:9100");
        assert!(load(&vars).unwrap().metrics_addr.is_some());

        vars.insert("METRICS_ADDR", "not-an-addr");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidMetricsAddr)));
    }
}
