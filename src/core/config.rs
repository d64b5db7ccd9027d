use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_MESSAGE_PATTERN: &str = ".*";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::new(
                "LogLevel",
                "Log level must be one of: debug, info, warn, error",
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github_token: String,
    pub slack_bot_token: String,
    pub slack_app_token: String,
    pub slack_channel_id: Option<String>,
    pub message_pattern: String,
    pub default_owner: Option<String>,
    pub default_repo: Option<String>,
    pub log_level: LogLevel,
    pub github_api_url: String,
    /// Time unit for approval retry backoff.
    pub retry_base_delay: Duration,
}

/// The part of the configuration the message router consults per message.
#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    pub channel_filter: Option<String>,
    pub default_owner: Option<String>,
    pub default_repo: Option<String>,
    pub bot_user_id: Option<String>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns a `ConfigError` for missing tokens or token prefixes Slack would
    /// reject. The message pattern is checked when the matcher is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github_token.is_empty() {
            return Err(ConfigError::new("GitHubToken", "GitHub token is required"));
        }
        if self.slack_bot_token.is_empty() {
            return Err(ConfigError::new("SlackBotToken", "Slack bot token is required"));
        }
        if self.slack_app_token.is_empty() {
            return Err(ConfigError::new("SlackAppToken", "Slack app token is required"));
        }
        if !self.slack_bot_token.starts_with("xoxb-") {
            return Err(ConfigError::new(
                "SlackBotToken",
                "Slack bot token must start with 'xoxb-'",
            ));
        }
        if !self.slack_app_token.starts_with("xapp-") {
            return Err(ConfigError::new(
                "SlackAppToken",
                "Slack app token must start with 'xapp-'",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn router_settings(&self, bot_user_id: Option<String>) -> RouterSettings {
        RouterSettings {
            channel_filter: self.slack_channel_id.clone(),
            default_owner: self.default_owner.clone(),
            default_repo: self.default_repo.clone(),
            bot_user_id,
        }
    }

    /// Human-readable scope of the channel filter, for startup logs.
    #[must_use]
    pub fn channel_scope(&self) -> &str {
        self.slack_channel_id.as_deref().unwrap_or("all channels")
    }
}
