//! Shared library for the wedding RSVP Lambda.
//!
//! This crate provides the RSVP data model, notification formatting, the
//! messaging API client and the HTTP response helpers used by the handler.

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod models;
pub mod telegram;

pub use config::{BotToken, Config, TelegramTarget};
pub use error::{Error, Result};
pub use http::{
    error_response, json_response, method_not_allowed, preflight_response, ApiResponse,
};
pub use message::format_message;
pub use models::{Attendance, RsvpRequest, RsvpSubmission};
pub use telegram::{
    send_with_deadline, MessageReceipt, MessagingApi, SendMessage, TelegramClient,
    UPSTREAM_TIMEOUT,
};

#[cfg(feature = "mock")]
pub use telegram::MockMessagingApi;
