use crate::constants::TELEGRAM_REQUEST_TIMEOUT_SECS;
use crate::watcher::delivery::{DeliveryError, Notifier, SendOptions};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_web_page_preview: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    migrate_to_chat_id: Option<i64>,
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Telegram Bot API `sendMessage` client.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url.trim_end_matches('/'), self.token)
    }
}

impl Notifier for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str, options: &SendOptions) -> Result<(), DeliveryError> {
        let payload = SendMessageRequest {
            chat_id,
            text,
            parse_mode: options.parse_mode,
            disable_web_page_preview: options.disable_preview,
        };

        // Request errors carry the URL, which contains the bot token.
        let response = self
            .http
            .post(self.send_url())
            .json(&payload)
            .timeout(Duration::from_secs(TELEGRAM_REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;

        debug!("Telegram responded {} to chat {}", status, chat_id);
        interpret_response(status, &body)
    }
}

/// Maps a `sendMessage` response to success or a structured API error.
pub fn interpret_response(status: u16, body: &str) -> Result<(), DeliveryError> {
    let success = (200..300).contains(&status);

    let Ok(parsed) = serde_json::from_str::<ApiResponse>(body) else {
        if success {
            return Ok(());
        }
        return Err(DeliveryError::Api {
            status,
            description: body.chars().take(200).collect(),
            migrate_to_chat_id: None,
            retry_after: None,
        });
    };

    if parsed.ok && success {
        return Ok(());
    }

    let parameters = parsed.parameters.unwrap_or_default();
    Err(DeliveryError::Api {
        status,
        description: parsed
            .description
            .unwrap_or_else(|| "no description".to_string()),
        migrate_to_chat_id: parameters.migrate_to_chat_id,
        retry_after: parameters.retry_after,
    })
}
