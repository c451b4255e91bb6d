//! Telegram Bot API client used to relay RSVP notifications.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BotToken;
use crate::{Error, Result};

/// Deadline for a single relay attempt.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Messaging API capable of delivering one chat message.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait MessagingApi: Send + Sync + 'static {
    fn send_message(
        &self,
        token: &BotToken,
        message: &SendMessage,
    ) -> impl Future<Output = Result<MessageReceipt>> + Send;
}

/// `sendMessage` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
    pub disable_notification: bool,
}

impl SendMessage {
    /// A Markdown message that notifies the chat members.
    pub fn markdown(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: "Markdown",
            disable_notification: false,
        }
    }
}

/// Delivery confirmation from the messaging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageReceipt {
    pub message_id: i64,
}

/// Telegram response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    result: Option<SentMessage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram Bot API over HTTPS.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl TelegramClient {
    /// Create a new client against the given API base URL.
    pub fn new(http_client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
        }
    }

    fn endpoint(&self, token: &BotToken) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, token.as_str())
    }
}

impl MessagingApi for TelegramClient {
    async fn send_message(&self, token: &BotToken, message: &SendMessage) -> Result<MessageReceipt> {
        // The URL embeds the token, so it is stripped from every transport error.
        let response = self
            .http_client
            .post(self.endpoint(token))
            .json(message)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .json::<Envelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.description);

            return Err(Error::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                description,
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        receipt_from(envelope, status.as_u16())
    }
}

fn receipt_from(envelope: Envelope, status: u16) -> Result<MessageReceipt> {
    match envelope {
        Envelope {
            ok: true,
            result: Some(sent),
            ..
        } => Ok(MessageReceipt {
            message_id: sent.message_id,
        }),
        Envelope {
            ok: true,
            result: None,
            ..
        } => Err(Error::Internal(
            "messaging API reported success without a message".to_string(),
        )),
        Envelope {
            ok: false,
            description,
            ..
        } => {
            warn!(status, "Messaging API answered ok=false with a success status");
            Err(Error::Upstream {
                status,
                status_text: String::new(),
                description,
            })
        }
    }
}

/// Send one message, giving up once `deadline` elapses.
///
/// Hitting the deadline drops the in-flight call and yields
/// [`Error::UpstreamTimeout`]; every other failure passes through unchanged.
pub async fn send_with_deadline<M: MessagingApi>(
    api: &M,
    token: &BotToken,
    message: &SendMessage,
    deadline: Duration,
) -> Result<MessageReceipt> {
    match tokio::time::timeout(deadline, api.send_message(token, message)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Error::UpstreamTimeout(deadline)),
    }
}
