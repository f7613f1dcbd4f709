use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Telegram API error ({status}): {description}")]
    Api {
        status: u16,
        description: String,
        migrate_to_chat_id: Option<i64>,
        retry_after: Option<u64>,
    },
}

impl DeliveryError {
    /// New chat id when the destination chat was migrated (e.g. group to supergroup).
    pub fn migrate_to(&self) -> Option<String> {
        match self {
            DeliveryError::Api { migrate_to_chat_id: Some(id), .. } => Some(id.to_string()),
            _ => None,
        }
    }

    /// Back-off hint from the API. Reported, not enforced.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            DeliveryError::Api { retry_after, .. } => *retry_after,
            DeliveryError::Request(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<&'static str>,
    pub disable_preview: Option<bool>,
}

/// A chat endpoint messages can be sent to.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send_message(&self, chat_id: &str, text: &str, options: &SendOptions) -> Result<(), DeliveryError>;
}

/// Sends `message` to `chat_id` and returns the chat it was delivered to.
///
/// When the endpoint reports that the chat moved, the message is resent once
/// to the new chat and that id is returned so the caller can use it for all
/// later sends. A second migration or any other error is returned as is.
pub async fn deliver<N: Notifier>(
    notifier: &N,
    chat_id: &str,
    message: &str,
    options: &SendOptions,
) -> Result<String, DeliveryError> {
    let err = match notifier.send_message(chat_id, message, options).await {
        Ok(()) => return Ok(chat_id.to_string()),
        Err(err) => err,
    };

    let Some(migrated_id) = err.migrate_to().filter(|id| id != chat_id) else {
        return Err(err);
    };

    warn!("Chat migrated from {} to {}; retrying delivery.", chat_id, migrated_id);
    notifier.send_message(&migrated_id, message, options).await?;
    Ok(migrated_id)
}
