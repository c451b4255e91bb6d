//! Configuration management for the RSVP Lambda.

use std::env;

use crate::{Error, Result};

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Application configuration loaded from environment variables.
///
/// Credentials are optional here so a misconfigured deployment still starts and
/// answers every request with a configuration error instead of crashing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: Option<String>,
    /// Destination chat id
    pub chat_id: Option<String>,
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
}

/// Credentials that passed the configuration check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramTarget {
    pub bot_token: BotToken,
    pub chat_id: String,
}

/// A bot token of the form `<numeric bot id>:<secret>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    /// Check the token shape. The secret itself is never inspected beyond its alphabet.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (bot_id, secret) = raw
            .split_once(':')
            .ok_or_else(|| Error::Config("bot token has no ':' separator".to_string()))?;

        if bot_id.is_empty() || !bot_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config("bot token id is not numeric".to_string()));
        }

        if secret.is_empty()
            || !secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Config("bot token secret is malformed".to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bot_id = self.0.split(':').next().unwrap_or_default();
        write!(f, "BotToken({}:***)", bot_id)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bot_token: non_blank("TELEGRAM_BOT_TOKEN"),
            chat_id: non_blank("TELEGRAM_CHAT_ID"),
            telegram_api_url: non_blank("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        }
    }

    /// Resolve the credentials needed to relay a message.
    pub fn telegram_target(&self) -> Result<TelegramTarget> {
        let bot_token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN not set".to_string()))?;
        let chat_id = self
            .chat_id
            .as_deref()
            .ok_or_else(|| Error::Config("TELEGRAM_CHAT_ID not set".to_string()))?;

        Ok(TelegramTarget {
            bot_token: BotToken::parse(bot_token)?,
            chat_id: chat_id.trim().to_string(),
        })
    }
}
