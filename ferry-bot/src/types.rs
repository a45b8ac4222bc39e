//! Core data types shared across the bot.

use serde::{Deserialize, Serialize};

/// Resolved handle for a channel or group.
///
/// Produced by the channel resolver from a raw identifier string.
/// Equality is by resolver-assigned id, not by the raw string the
/// operator typed to obtain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Telegram chat id (negative for channels and supergroups)
    pub id: i64,
    /// The raw identifier the operator supplied (`-100...` or `@handle`)
    pub raw: String,
    /// Channel title, when the resolver reports one
    pub title: Option<String>,
}

impl PartialEq for ChannelRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChannelRef {}

impl ChannelRef {
    /// Human-readable label: the title when known, the raw identifier otherwise.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.raw)
    }
}

/// One selected message inside the source channel, captured at forward time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Chat the message was originally posted in. Absent when the
    /// original sender disabled forward attribution.
    pub origin_chat_id: Option<i64>,
    /// Message id inside the origin chat
    pub message_id: i64,
}

impl MessageRef {
    /// Whether forward attribution identified the origin chat.
    pub const fn attributed(&self) -> bool {
        self.origin_chat_id.is_some()
    }
}

/// Outcome tally of one archive run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl TransferResult {
    /// Total number of messages processed.
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ref_equality_is_by_id() {
        let a = ChannelRef {
            id: -100123,
            raw: "-100123".into(),
            title: Some("News".into()),
        };
        let b = ChannelRef {
            id: -100123,
            raw: "@news".into(),
            title: None,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn channel_ref_label_prefers_title() {
        let with_title = ChannelRef {
            id: -1,
            raw: "-1".into(),
            title: Some("News".into()),
        };
        let without = ChannelRef {
            id: -1,
            raw: "-1".into(),
            title: None,
        };
        assert_eq!(with_title.label(), "News");
        assert_eq!(without.label(), "-1");
    }

    #[test]
    fn message_ref_attribution() {
        let attributed = MessageRef {
            origin_chat_id: Some(-100123),
            message_id: 7,
        };
        let bare = MessageRef {
            origin_chat_id: None,
            message_id: 7,
        };
        assert!(attributed.attributed());
        assert!(!bare.attributed());
    }

    #[test]
    fn transfer_result_total() {
        let result = TransferResult {
            succeeded: 2,
            failed: 1,
        };
        assert_eq!(result.total(), 3);
    }
}
