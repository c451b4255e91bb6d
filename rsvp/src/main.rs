//! RSVP Lambda - Handles the wedding invitation form.
//!
//! Endpoints:
//! - POST /rsvp - Validate a guest's answer and relay it to the organizers' Telegram chat
//! - OPTIONS /rsvp - CORS pre-flight
//!
//! The function is stateless. Every failure becomes a JSON response, so a bad
//! request or an upstream outage never takes the function down.

use chrono::{DateTime, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{
    error_response, format_message, json_response, method_not_allowed, preflight_response,
    send_with_deadline, ApiResponse, Config, MessageReceipt, MessagingApi, RsvpSubmission,
    SendMessage, TelegramClient, UPSTREAM_TIMEOUT,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Paths the form may post to.
const RSVP_PATHS: [&str; 2] = ["/rsvp", "/api/rsvp"];

const CONFIRMATION: &str = "Спасибо! Ваш ответ успешно отправлен";

/// Application state shared across requests.
struct AppState<M> {
    config: Config,
    messaging: M,
    upstream_timeout: Duration,
}

impl AppState<TelegramClient> {
    fn from_env() -> Self {
        let config = Config::from_env();

        if let Err(e) = config.telegram_target() {
            // Not fatal: requests answer with a configuration error until fixed.
            warn!(error = %e, "Telegram relay is not configured");
        }

        let messaging = TelegramClient::new(reqwest::Client::new(), &config.telegram_api_url);

        Self {
            config,
            messaging,
            upstream_timeout: UPSTREAM_TIMEOUT,
        }
    }
}

async fn handler<M: MessagingApi>(
    state: Arc<AppState<M>>,
    event: Request,
) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!(method, path, "RSVP request");

    if !RSVP_PATHS.contains(&path) {
        return json_response(404, &ApiResponse::error("Not found"));
    }

    match method {
        "OPTIONS" => preflight_response(),
        "POST" => match submit(&state, event.body().as_ref(), Utc::now()).await {
            Ok(receipt) => {
                info!(message_id = receipt.message_id, "RSVP delivered");
                json_response(200, &ApiResponse::success(CONFIRMATION))
            }
            Err(e) => failure_response(&e),
        },
        _ => method_not_allowed(),
    }
}

/// Validate, check configuration, format and relay one submission.
async fn submit<M: MessagingApi>(
    state: &AppState<M>,
    body: &[u8],
    received_at: DateTime<Utc>,
) -> shared::Result<MessageReceipt> {
    let submission = RsvpSubmission::from_json(body)?;
    let target = state.config.telegram_target()?;

    info!(attendance = ?submission.attendance, "Relaying RSVP");

    let message = SendMessage::markdown(target.chat_id, format_message(&submission, received_at));
    send_with_deadline(
        &state.messaging,
        &target.bot_token,
        &message,
        state.upstream_timeout,
    )
    .await
}

fn failure_response(err: &shared::Error) -> Result<Response<Body>, Error> {
    let request_id = err.is_internal().then(|| Uuid::now_v7().to_string());

    match err {
        shared::Error::InvalidInput(_) => warn!(error = %err, "Rejected RSVP"),
        shared::Error::Config(_) => error!(error = %err, "RSVP relay is misconfigured"),
        shared::Error::UpstreamTimeout(_) => error!(error = %err, "Messaging API timed out"),
        shared::Error::Upstream {
            status,
            description,
            ..
        } => error!(
            status,
            description = description.as_deref().unwrap_or_default(),
            "Messaging API rejected RSVP"
        ),
        _ => error!(
            request_id = request_id.as_deref().unwrap_or_default(),
            error = %err,
            "Unexpected error relaying RSVP"
        ),
    }

    error_response(err, request_id)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::from_env());

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ALLOW, CONTENT_TYPE,
    };
    use serde_json::{json, Value};
    use shared::{BotToken, MockMessagingApi};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn configured() -> Config {
        Config {
            bot_token: Some("123456:ABC-def_ghi".to_string()),
            chat_id: Some("-100200300".to_string()),
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }

    fn unconfigured() -> Config {
        Config {
            bot_token: None,
            chat_id: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }

    fn state(config: Config, messaging: MockMessagingApi) -> Arc<AppState<MockMessagingApi>> {
        Arc::new(AppState {
            config,
            messaging,
            upstream_timeout: UPSTREAM_TIMEOUT,
        })
    }

    fn no_calls() -> MockMessagingApi {
        let mut mock = MockMessagingApi::new();
        mock.expect_send_message().never();
        mock
    }

    fn replying(
        result: impl FnOnce() -> shared::Result<MessageReceipt> + Send + 'static,
    ) -> MockMessagingApi {
        let mut mock = MockMessagingApi::new();
        mock.expect_send_message()
            .once()
            .return_once(move |_, _| Box::pin(std::future::ready(result())));
        mock
    }

    fn request(method: &str, body: Value) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/rsvp")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post(body: Value) -> Request {
        request("POST", body)
    }

    fn body_json(response: &Response<Body>) -> Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    fn anna() -> Value {
        json!({"name": "Anna", "attendance": "yes", "drinks": ["champagne", "vodka"]})
    }

    #[tokio::test]
    async fn test_delivers_valid_rsvp() {
        let mut mock = MockMessagingApi::new();
        mock.expect_send_message()
            .once()
            .withf(|token: &BotToken, message: &SendMessage| {
                token.as_str() == "123456:ABC-def_ghi"
                    && message.chat_id == "-100200300"
                    && message.parse_mode == "Markdown"
                    && !message.disable_notification
                    && message.text.contains("Шампанское, Водка")
                    && message.text.contains("Придёт")
            })
            .return_once(|_, _| {
                Box::pin(std::future::ready(Ok::<_, shared::Error>(MessageReceipt {
                    message_id: 42,
                })))
            });

        let response = handler(state(configured(), mock), post(anna())).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            body_json(&response),
            json!({"success": true, "message": CONFIRMATION})
        );
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected_without_relay() {
        for body in [
            json!({"attendance": "yes"}),
            json!({"name": "   ", "attendance": "yes"}),
        ] {
            let response = handler(state(configured(), no_calls()), post(body)).await.unwrap();
            assert_eq!(response.status(), 400);
            assert_eq!(body_json(&response)["success"], false);
        }
    }

    #[tokio::test]
    async fn test_bad_attendance_is_rejected_without_relay() {
        let body = json!({"name": "Anna", "attendance": "maybe"});
        let response = handler(state(configured(), no_calls()), post(body)).await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let event = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/rsvp")
            .body(Body::from("{name"))
            .unwrap();
        let response = handler(state(configured(), no_calls()), event).await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_array_body_is_rejected_without_relay() {
        let response = handler(state(configured(), no_calls()), post(json!(["Anna", "yes"])))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response)["success"], false);
    }

    #[tokio::test]
    async fn test_guest_markdown_is_escaped_in_relay() {
        let mut mock = MockMessagingApi::new();
        mock.expect_send_message()
            .once()
            .withf(|_, message: &SendMessage| {
                message.text.contains(r"anna\_k@example.com")
                    && message.text.contains(r"\*Anna\*")
            })
            .return_once(|_, _| {
                Box::pin(std::future::ready(Ok::<_, shared::Error>(MessageReceipt {
                    message_id: 7,
                })))
            });

        let body = json!({"name": "*Anna*", "attendance": "yes", "email": "anna_k@example.com"});
        let response = handler(state(configured(), mock), post(body)).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_missing_config_is_server_error_without_relay() {
        let response = handler(state(unconfigured(), no_calls()), post(anna())).await.unwrap();
        assert_eq!(response.status(), 500);
        let body = body_json(&response);
        assert_eq!(body["success"], false);
        assert!(!body.to_string().contains("TELEGRAM"));
        assert!(body.get("requestId").is_none());
    }

    #[tokio::test]
    async fn test_malformed_token_is_server_error_without_relay() {
        let mut config = configured();
        config.bot_token = Some("not-a-token".to_string());
        let response = handler(state(config, no_calls()), post(anna())).await.unwrap();
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn test_unauthorized_upstream_maps_to_bad_gateway() {
        let mock = replying(|| {
            Err(shared::Error::Upstream {
                status: 401,
                status_text: "Unauthorized".to_string(),
                description: Some("Unauthorized".to_string()),
            })
        });

        let response = handler(state(configured(), mock), post(anna())).await.unwrap();

        assert_eq!(response.status(), 502);
        assert_eq!(
            body_json(&response),
            json!({"success": false, "error": "Неверный токен бота", "details": "Unauthorized"})
        );
    }

    #[tokio::test]
    async fn test_chat_not_found_maps_to_bad_gateway() {
        let mock = replying(|| {
            Err(shared::Error::Upstream {
                status: 404,
                status_text: "Not Found".to_string(),
                description: None,
            })
        });

        let response = handler(state(configured(), mock), post(anna())).await.unwrap();

        assert_eq!(response.status(), 502);
        assert_eq!(body_json(&response)["error"], "Чат не найден");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_timeout_aborts_call() {
        struct DropFlag(Arc<AtomicBool>);

        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dropped);

        let mut mock = MockMessagingApi::new();
        mock.expect_send_message()
            .once()
            .return_once(move |_, _| {
                Box::pin(async move {
                    let _guard = DropFlag(flag);
                    std::future::pending::<shared::Result<MessageReceipt>>().await
                })
            });

        let response = handler(state(configured(), mock), post(anna())).await.unwrap();

        assert_eq!(response.status(), 504);
        assert_eq!(body_json(&response)["success"], false);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_internal_error_carries_request_id() {
        let mock = replying(|| Err(shared::Error::Internal("connection reset".to_string())));

        let response = handler(state(configured(), mock), post(anna())).await.unwrap();

        assert_eq!(response.status(), 500);
        let body = body_json(&response);
        assert!(body["requestId"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = handler(state(unconfigured(), no_calls()), request("OPTIONS", json!(null)))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let headers = response.headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");
    }

    #[tokio::test]
    async fn test_other_methods_and_paths() {
        let response = handler(state(configured(), no_calls()), request("GET", json!(null)))
            .await
            .unwrap();
        assert_eq!(response.status(), 405);
        assert_eq!(response.headers()[ALLOW], "POST, OPTIONS");

        let event = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/elsewhere")
            .body(Body::from(anna().to_string()))
            .unwrap();
        let response = handler(state(configured(), no_calls()), event).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_api_prefixed_path() {
        let mock = replying(|| Ok(MessageReceipt { message_id: 1 }));
        let event = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/api/rsvp")
            .body(Body::from(anna().to_string()))
            .unwrap();
        let response = handler(state(configured(), mock), event).await.unwrap();
        assert_eq!(response.status(), 200);
    }
}
