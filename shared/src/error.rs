//! Error types for the RSVP relay.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling an RSVP submission.
///
/// `Display` is the operator-facing diagnostic and only goes to logs.
/// Callers see [`Error::public_message`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The submission is missing a name or a valid attendance answer
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Deployment configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The messaging API did not answer before the deadline
    #[error("Messaging API timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),

    /// The messaging API rejected the message
    #[error("Messaging API returned {status} {status_text}: {}", .description.as_deref().unwrap_or("no description"))]
    Upstream {
        status: u16,
        status_text: String,
        description: Option<String>,
    },

    /// Transport error talking to the messaging API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::Upstream { .. } => 502,
            Error::UpstreamTimeout(_) => 504,
            _ => 500,
        }
    }

    /// Localized message that is safe to show to a guest.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "Пожалуйста, укажите имя и выберите, придёте ли вы",
            Error::Config(_) => {
                "Ошибка конфигурации сервера. Пожалуйста, свяжитесь с организаторами"
            }
            Error::UpstreamTimeout(_) => "Превышено время ожидания ответа. Попробуйте ещё раз",
            Error::Upstream { status, .. } => match status {
                401 => "Неверный токен бота",
                400 => "Неверный формат запроса",
                404 => "Чат не найден",
                _ => "Ошибка при отправке сообщения в Telegram",
            },
            _ => "Внутренняя ошибка сервера. Попробуйте позже",
        }
    }

    /// Non-sensitive detail that may be returned alongside the public message.
    pub fn public_details(&self) -> Option<&str> {
        match self {
            Error::Upstream { status_text, .. } if !status_text.is_empty() => {
                Some(status_text.as_str())
            }
            _ => None,
        }
    }

    /// Whether the fault is unclassified and needs a correlation id.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Serialization(_) | Error::Internal(_)
        )
    }
}
