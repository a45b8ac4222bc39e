//! Telegram transport adapter.
//!
//! Wraps the Bot API behind the core's trait seams: channel resolution
//! via `getChat`, the copy primitive via `copyMessage`, and operator
//! messaging via `sendMessage`/`editMessageText` with inline keyboards.
//! Updates are received with `getUpdates` long polling.

use crate::event::{looks_like_channel_identifier, Incoming};
use crate::traits::{
    ChannelResolver, CopyError, InlineButton, MessageCopier, PresentError, Presenter,
    ResolveError,
};
use crate::types::ChannelRef;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Telegram message length limit.
const MAX_MESSAGE_LEN: usize = 4096;

/// Long-poll timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("telegram api error ({status}): {description}")]
    Api { status: u16, description: String },

    #[error("network error: {0}")]
    Network(String),
}

/// Bot API client.
pub struct TelegramApi {
    token: String,
    api_base: String,
    client: reqwest::Client,
    /// Last message id this bot sent per chat, for in-place edits
    last_sent: DashMap<i64, i64>,
}

impl TelegramApi {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into(),
            client: reqwest::Client::new(),
            last_sent: DashMap::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value, ApiError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if data.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(data.get("result").cloned().unwrap_or(Value::Null))
        } else {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(ApiError::Api {
                status,
                description,
            })
        }
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn verify_token(&self) -> anyhow::Result<()> {
        let me = self.call("getMe", &serde_json::json!({})).await?;
        let username = me.get("username").and_then(Value::as_str).unwrap_or("?");
        tracing::info!(bot_username = username, "Telegram token verified");
        Ok(())
    }

    /// Fetch pending updates, long-polling up to [`POLL_TIMEOUT_SECS`].
    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Value>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "callback_query"]
        });

        let result = self.call("getUpdates", &body).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    /// Acknowledge an inline button click.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({ "callback_query_id": callback_query_id });
        self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    async fn get_chat(&self, identifier: &str) -> Result<ChannelRef, ResolveError> {
        // Numeric ids go out as numbers, @handles as strings
        let chat_id = identifier
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(identifier));

        match self.call("getChat", &serde_json::json!({ "chat_id": chat_id })).await {
            Ok(result) => {
                let id = result.get("id").and_then(Value::as_i64).ok_or_else(|| {
                    ResolveError::Transport("missing chat id in getChat response".into())
                })?;
                let title = result
                    .get("title")
                    .and_then(Value::as_str)
                    .map(String::from);
                Ok(ChannelRef {
                    id,
                    raw: identifier.to_string(),
                    title,
                })
            }
            Err(ApiError::Api { description, .. }) => Err(ResolveError::NotFound(description)),
            Err(ApiError::Network(e)) => Err(ResolveError::Transport(e)),
        }
    }

    /// Send a single chunk with HTML parse mode, retrying without
    /// parse mode when Telegram rejects the entities.
    async fn send_chunk(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Value>,
    ) -> Result<i64, ApiError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML"
        });
        if let Some(kb) = &keyboard {
            body["reply_markup"] = serde_json::json!({ "inline_keyboard": kb });
        }

        match self.call("sendMessage", &body).await {
            Ok(result) => extract_message_id(&result),
            Err(ApiError::Api {
                status: 400,
                description,
            }) if description.contains("parse entities") => {
                tracing::warn!(
                    error = %description,
                    "Telegram HTML parsing failed, retrying without parse_mode"
                );
                let mut plain = serde_json::json!({ "chat_id": chat_id, "text": text });
                if let Some(kb) = &keyboard {
                    plain["reply_markup"] = serde_json::json!({ "inline_keyboard": kb });
                }
                let result = self.call("sendMessage", &plain).await?;
                extract_message_id(&result)
            }
            Err(e) => Err(e),
        }
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML"
        });
        self.call("editMessageText", &body).await?;
        Ok(())
    }
}

fn extract_message_id(result: &Value) -> Result<i64, ApiError> {
    result
        .get("message_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::Network("missing message_id in sendMessage response".into()))
}

/// Render one inline button per row, as the prompts expect.
fn keyboard(buttons: &[InlineButton]) -> Value {
    Value::Array(
        buttons
            .iter()
            .map(|b| {
                serde_json::json!([{
                    "text": b.text,
                    "callback_data": b.callback_data
                }])
            })
            .collect(),
    )
}

/// Split a message into chunks that fit within Telegram's limit,
/// preferring paragraph and sentence boundaries.
fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Back off to a char boundary so the slice never lands inside
        // a multi-byte sequence
        let mut end = max_len;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = remaining
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(max_len);
        }

        let chunk = &remaining[..end];
        let split_pos = chunk
            .rfind("\n\n")
            .or_else(|| chunk.rfind('\n'))
            .or_else(|| chunk.rfind(". "))
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(end);

        let actual_split = if split_pos == 0 { end } else { split_pos };

        chunks.push(remaining[..actual_split].to_string());
        remaining = remaining[actual_split..].trim_start();
    }

    chunks
}

#[async_trait]
impl ChannelResolver for TelegramApi {
    async fn resolve(&self, identifier: &str) -> Result<ChannelRef, ResolveError> {
        if !looks_like_channel_identifier(identifier) {
            return Err(ResolveError::InvalidIdentifier(identifier.to_string()));
        }
        self.get_chat(identifier.trim()).await
    }
}

#[async_trait]
impl MessageCopier for TelegramApi {
    async fn copy_message(
        &self,
        destination: &ChannelRef,
        source: &ChannelRef,
        message_id: i64,
    ) -> Result<(), CopyError> {
        let body = serde_json::json!({
            "chat_id": destination.id,
            "from_chat_id": source.id,
            "message_id": message_id
        });

        match self.call("copyMessage", &body).await {
            Ok(_) => Ok(()),
            Err(ApiError::Api { description, .. }) => Err(CopyError::Rejected(description)),
            Err(ApiError::Network(e)) => Err(CopyError::Transport(e)),
        }
    }
}

#[async_trait]
impl Presenter for TelegramApi {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<(), PresentError> {
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let last_index = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            // Keyboard goes on the final chunk only
            let kb = (i == last_index && !buttons.is_empty()).then(|| keyboard(buttons));
            let message_id = self
                .send_chunk(chat_id, chunk, kb)
                .await
                .map_err(|e| PresentError(e.to_string()))?;
            self.last_sent.insert(chat_id, message_id);
        }

        Ok(())
    }

    async fn edit_last_message(&self, chat_id: i64, text: &str) -> Result<(), PresentError> {
        let last = self.last_sent.get(&chat_id).map(|entry| *entry);

        if let Some(message_id) = last {
            match self.edit_message(chat_id, message_id, text).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(error = %e, "edit failed, sending fresh message");
                }
            }
        }

        let message_id = self
            .send_chunk(chat_id, text, None)
            .await
            .map_err(|e| PresentError(e.to_string()))?;
        self.last_sent.insert(chat_id, message_id);
        Ok(())
    }
}

/// Operator allow-list: usernames or numeric user ids, `*` for everyone.
#[derive(Debug, Clone)]
pub struct AllowList {
    allowed: Vec<String>,
}

impl AllowList {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn is_allowed(&self, username: Option<&str>, user_id: i64) -> bool {
        let id = user_id.to_string();
        self.allowed
            .iter()
            .any(|u| u == "*" || Some(u.as_str()) == username || *u == id)
    }
}

/// Long-poll the Bot API and hand classified events to `on_event`.
///
/// Button clicks are acknowledged here before dispatch. Poll errors
/// are logged and retried after a short sleep; the loop itself never
/// returns under normal operation.
pub async fn poll_loop<F>(api: Arc<TelegramApi>, allow: AllowList, on_event: F) -> anyhow::Result<()>
where
    F: Fn(Incoming) + Send + Sync + 'static,
{
    let mut offset: i64 = 0;

    tracing::info!("Ferry listening for updates...");

    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "Telegram poll error");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            if let Some(update_id) = update.get("update_id").and_then(Value::as_i64) {
                offset = offset.max(update_id + 1);
            }

            let incoming = if let Some(callback) = update.get("callback_query") {
                if let Some(id) = callback.get("id").and_then(Value::as_str) {
                    if let Err(e) = api.answer_callback_query(id).await {
                        tracing::warn!(error = %e, "failed to answer callback query");
                    }
                }
                Incoming::from_callback_query(callback)
            } else if let Some(message) = update.get("message") {
                Incoming::from_message(message)
            } else {
                None
            };

            let Some(incoming) = incoming else { continue };

            if !allow.is_allowed(incoming.username.as_deref(), incoming.user_id) {
                tracing::warn!(
                    user_id = incoming.user_id,
                    username = incoming.username.as_deref().unwrap_or("unknown"),
                    "ignoring update from unauthorized user"
                );
                continue;
            }

            let trace_id = ferry_common::logging::generate_trace_id();
            tracing::info!(
                trace_id = %trace_id,
                user_id = incoming.user_id,
                chat_id = incoming.chat_id,
                "update received"
            );

            on_event(incoming);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_format() {
        let api = TelegramApi::new("123:ABC", "https://api.telegram.org");
        assert_eq!(
            api.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn allow_list_wildcard() {
        let allow = AllowList::new(vec!["*".into()]);
        assert!(allow.is_allowed(Some("anyone"), 1));
        assert!(allow.is_allowed(None, 99));
    }

    #[test]
    fn allow_list_by_username_or_id() {
        let allow = AllowList::new(vec!["alice".into(), "12345".into()]);
        assert!(allow.is_allowed(Some("alice"), 1));
        assert!(allow.is_allowed(None, 12345));
        assert!(!allow.is_allowed(Some("eve"), 2));
    }

    #[test]
    fn split_message_short() {
        let result = split_message("Hello, World!", 4096);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0], "Hello, World!");
    }

    #[test]
    fn split_message_long() {
        let msg = "x".repeat(5000);
        let result = split_message(&msg, 4096);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn split_message_never_splits_inside_a_char() {
        // 2-byte chars with a limit that lands mid-sequence
        let msg = "é".repeat(30);
        let result = split_message(&msg, 25);
        assert!(result.len() > 1);
        assert!(result.iter().all(|c| c.len() <= 25));
        assert_eq!(result.concat(), msg);
    }

    #[test]
    fn split_message_prefers_newlines() {
        let msg = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let result = split_message(&msg, 40);
        assert_eq!(result[0], "a".repeat(30));
    }

    #[test]
    fn keyboard_renders_one_button_per_row() {
        let kb = keyboard(&[
            InlineButton::new("Help", "help"),
            InlineButton::new("Cancel", "cancel_archive"),
        ]);
        let rows = kb.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["callback_data"], "help");
        assert_eq!(rows[1][0]["text"], "Cancel");
    }
}
