//! Telegram notification backend

use crate::error::{NotifyError, Result};
use crate::event::RotationEvent;
use crate::Notifier;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// sendMessage rejects longer texts
const MAX_MESSAGE_CHARS: usize = 4096;
/// Attempts per message when Telegram throttles or fails server-side
const MAX_ATTEMPTS: u32 = 3;
/// Longest `retry_after` we are willing to wait inside a rotation task
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);
const SERVER_ERROR_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    /// Routine rotations arrive silently; faults ring
    disable_notification: bool,
}

/// Telegram notification backend
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        )
    }

    async fn send_telegram_message(&self, text: &str, silent: bool) -> Result<()> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let text = fit_message(text);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "Markdown",
            disable_notification: silent,
        };

        let mut attempt = 1;
        loop {
            debug!("Sending Telegram message to chat {} (attempt {})", self.chat_id, attempt);

            let response = self
                .client
                .post(self.api_url())
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            let body: TelegramResponse = response.json().await?;

            if body.ok {
                debug!("Telegram notification sent");
                return Ok(());
            }

            match retry_delay(status, &body) {
                Some(wait) if attempt < MAX_ATTEMPTS => {
                    warn!("Telegram returned {}, retrying in {:?}", status, wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                _ => {
                    let error_msg = body
                        .description
                        .unwrap_or_else(|| format!("HTTP {}", status));
                    error!("Telegram API error: {}", error_msg);
                    return Err(NotifyError::telegram(error_msg));
                }
            }
        }
    }
}

/// How long to wait before resending, or None when the failure is final
fn retry_delay(status: StatusCode, body: &TelegramResponse) -> Option<Duration> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let secs = body
            .parameters
            .as_ref()
            .and_then(|p| p.retry_after)
            .unwrap_or(1);
        let wait = Duration::from_secs(secs);
        return (wait <= MAX_RETRY_WAIT).then_some(wait);
    }
    status.is_server_error().then_some(SERVER_ERROR_WAIT)
}

/// Clip to the sendMessage limit on a char boundary
fn fit_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    clipped.push('\u{2026}');
    clipped
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.send_telegram_message(message, false).await
    }

    async fn send_rotation_event(&self, event: &RotationEvent) -> Result<()> {
        let silent = matches!(event, RotationEvent::Rotated { .. });
        self.send_telegram_message(&event.format_message(), silent)
            .await
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> TelegramResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_is_configured() {
        assert!(!TelegramNotifier::new(String::new(), "123".to_string()).is_configured());
        assert!(!TelegramNotifier::new("token".to_string(), String::new()).is_configured());
        assert!(TelegramNotifier::new("token".to_string(), "123".to_string()).is_configured());
    }

    #[test]
    fn test_api_url() {
        let notifier = TelegramNotifier::new("my_bot_token".to_string(), "123".to_string());
        assert_eq!(
            notifier.api_url(),
            "https://api.telegram.org/botmy_bot_token/sendMessage"
        );
    }

    #[test]
    fn test_request_body() {
        let request = SendMessageRequest {
            chat_id: "42",
            text: "hi",
            parse_mode: "Markdown",
            disable_notification: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["chat_id"], "42");
        assert_eq!(json["disable_notification"], true);
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        let throttled = response(
            r#"{"ok":false,"description":"Too Many Requests","parameters":{"retry_after":5}}"#,
        );
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &throttled),
            Some(Duration::from_secs(5))
        );

        let bare = response(r#"{"ok":false}"#);
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &bare),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_retry_delay_gives_up() {
        let long_wait = response(r#"{"ok":false,"parameters":{"retry_after":3600}}"#);
        assert_eq!(retry_delay(StatusCode::TOO_MANY_REQUESTS, &long_wait), None);

        let bad_chat = response(r#"{"ok":false,"description":"Bad Request: chat not found"}"#);
        assert_eq!(retry_delay(StatusCode::BAD_REQUEST, &bad_chat), None);
        assert_eq!(
            retry_delay(StatusCode::BAD_GATEWAY, &bad_chat),
            Some(SERVER_ERROR_WAIT)
        );
    }

    #[test]
    fn test_fit_message() {
        assert_eq!(fit_message("short"), "short");

        let long = "\u{00e9}".repeat(MAX_MESSAGE_CHARS + 10);
        let clipped = fit_message(&long);
        assert_eq!(clipped.chars().count(), MAX_MESSAGE_CHARS);
        assert!(clipped.ends_with('\u{2026}'));
    }

    #[tokio::test]
    async fn test_send_not_configured() {
        let notifier = TelegramNotifier::new(String::new(), String::new());
        let result = notifier.send("test").await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_rotation_event_not_configured() {
        let notifier = TelegramNotifier::new(String::new(), "123".to_string());
        let event = RotationEvent::ListFailed {
            error: "lister offline".to_string(),
        };
        let result = notifier.send_rotation_event(&event).await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }
}
