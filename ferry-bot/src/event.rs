//! Boundary classification of raw Telegram updates.
//!
//! Every update is classified exactly once into a tagged [`Event`];
//! handler logic downstream never re-inspects raw payloads or string
//! prefixes.

use serde_json::Value;

/// Recognized slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Archive,
}

impl Command {
    /// Parse a message text as a command, if it is one.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

/// Recognized inline button actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Help,
    Usage,
    CancelArchive,
    /// A raw channel identifier carried in the callback payload,
    /// used as a destination shortcut.
    RawIdentifier(String),
}

impl ButtonAction {
    /// Parse a callback payload. Unknown payloads are dropped.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "help" => Some(Self::Help),
            "usage" => Some(Self::Usage),
            "cancel_archive" => Some(Self::CancelArchive),
            p if looks_like_channel_identifier(p) => Some(Self::RawIdentifier(p.to_string())),
            _ => None,
        }
    }
}

/// One classified input from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    /// A forwarded message. Attribution fields are absent when the
    /// original sender disabled forward attribution.
    Forwarded {
        origin_chat_id: Option<i64>,
        origin_message_id: Option<i64>,
    },
    Text(String),
    Button(ButtonAction),
}

/// Envelope around an event: who sent it and where to answer.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub event: Event,
}

/// Channel identifiers are recognized by shape: Telegram's negative
/// numeric id convention (`-100...`) or a public `@handle`.
pub fn looks_like_channel_identifier(text: &str) -> bool {
    let t = text.trim();
    if let Some(handle) = t.strip_prefix('@') {
        return !handle.is_empty()
            && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    }
    if let Some(digits) = t.strip_prefix('-') {
        return !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    }
    false
}

impl Incoming {
    /// Classify a Bot API `message` object.
    ///
    /// Returns `None` for payloads the bot does not handle (stickers,
    /// photos sent directly, missing sender, ...).
    pub fn from_message(message: &Value) -> Option<Self> {
        let chat_id = message.get("chat")?.get("id")?.as_i64()?;
        let from = message.get("from")?;
        let user_id = from.get("id")?.as_i64()?;
        let username = from
            .get("username")
            .and_then(|u| u.as_str())
            .map(String::from);

        let event = if is_forwarded(message) {
            let (origin_chat_id, origin_message_id) = forward_attribution(message);
            Event::Forwarded {
                origin_chat_id,
                origin_message_id,
            }
        } else if let Some(text) = message.get("text").and_then(|t| t.as_str()) {
            match Command::parse(text) {
                Some(command) => Event::Command(command),
                None => Event::Text(text.to_string()),
            }
        } else {
            return None;
        };

        Some(Self {
            user_id,
            chat_id,
            username,
            event,
        })
    }

    /// Classify a Bot API `callback_query` object.
    pub fn from_callback_query(callback: &Value) -> Option<Self> {
        let data = callback.get("data")?.as_str()?;
        let from = callback.get("from")?;
        let user_id = from.get("id")?.as_i64()?;
        let username = from
            .get("username")
            .and_then(|u| u.as_str())
            .map(String::from);
        let chat_id = callback
            .get("message")?
            .get("chat")?
            .get("id")?
            .as_i64()?;

        let action = ButtonAction::parse(data)?;

        Some(Self {
            user_id,
            chat_id,
            username,
            event: Event::Button(action),
        })
    }
}

fn is_forwarded(message: &Value) -> bool {
    message.get("forward_origin").is_some()
        || message.get("forward_from_chat").is_some()
        || message.get("forward_date").is_some()
        || message.get("forward_sender_name").is_some()
}

/// Extract origin chat id and message id from forward metadata.
///
/// Bot API 7+ reports a `forward_origin` object; older servers report
/// `forward_from_chat` / `forward_from_message_id`. Hidden-attribution
/// forwards carry neither, and both fields come back `None`.
fn forward_attribution(message: &Value) -> (Option<i64>, Option<i64>) {
    if let Some(origin) = message.get("forward_origin") {
        let chat_id = origin
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64);
        let message_id = origin.get("message_id").and_then(Value::as_i64);
        if chat_id.is_some() || message_id.is_some() {
            return (chat_id, message_id);
        }
    }

    let chat_id = message
        .get("forward_from_chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64);
    let message_id = message
        .get("forward_from_message_id")
        .and_then(Value::as_i64);
    (chat_id, message_id)
}
