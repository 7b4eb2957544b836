use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::report::MarkupMode;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub status: u16,
    pub message_id: Option<i64>,
}

/// Rejected or failed delivery. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery failed (status {}): {message}", status_label(.status))]
pub struct DeliveryError {
    pub status: Option<u16>,
    pub message: String,
}

impl DeliveryError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| String::from("none"), |status| status.to_string())
}

pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<DeliveryStatus, DeliveryError>> + Send + 'a>>;

/// Message delivery endpoint.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn send<'a>(&'a self, text: &'a str, markup: MarkupMode) -> SendFuture<'a>;
}

/// Telegram Bot API `sendMessage`.
#[derive(Clone)]
pub struct TelegramSink {
    http_client: Arc<dyn HttpClient>,
    token: String,
    chat_id: String,
    timeout_ms: u64,
}

impl Debug for TelegramSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl TelegramSink {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token: token.into(),
            chat_id: chat_id.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn build_request(&self, text: &str, markup: MarkupMode) -> HttpRequest {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(parse_mode) = markup.parse_mode() {
            body["parse_mode"] = json!(parse_mode);
        }

        HttpRequest::post(format!(
            "{TELEGRAM_API_URL}/bot{}/sendMessage",
            self.token
        ))
        .with_json_body(&body)
        .with_timeout_ms(self.timeout_ms)
    }

    async fn send_message(
        &self,
        text: &str,
        markup: MarkupMode,
    ) -> Result<DeliveryStatus, DeliveryError> {
        debug!(chars = text.chars().count(), markup = %markup, "sending telegram message");
        let response = self
            .http_client
            .execute(self.build_request(text, markup))
            .await
            .map_err(|e| DeliveryError::transport(e.message()))?;

        let parsed = serde_json::from_str::<TelegramResponse>(&response.body).ok();
        if !response.is_success() || parsed.as_ref().is_some_and(|body| !body.ok) {
            let message = parsed
                .and_then(|body| body.description)
                .unwrap_or_else(|| response.body.clone());
            return Err(DeliveryError::rejected(response.status, message));
        }

        Ok(DeliveryStatus {
            status: response.status,
            message_id: parsed
                .and_then(|body| body.result)
                .and_then(|result| result.message_id),
        })
    }
}

impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn send<'a>(&'a self, text: &'a str, markup: MarkupMode) -> SendFuture<'a> {
        Box::pin(self.send_message(text, markup))
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    #[serde(default)]
    message_id: Option<i64>,
}
