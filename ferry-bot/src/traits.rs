//! Trait seams to the Telegram transport.
//!
//! The state machine and executor talk to Telegram only through these
//! traits, so the core protocol can be exercised with in-memory fakes.

use crate::types::ChannelRef;
use async_trait::async_trait;

/// Error resolving a user-supplied channel identifier.
///
/// Always user-correctable: reported inline, session state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("not a channel id or @handle: {0}")]
    InvalidIdentifier(String),

    #[error("channel not found or not reachable: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure copying a single message. Tallied per message; never fatal
/// to the batch.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("copy rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Systemic failure that aborts a batch before any copy is attempted.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("source channel could not be resolved: {0}")]
    Source(ResolveError),

    #[error("destination channel could not be resolved: {0}")]
    Destination(ResolveError),
}

/// Failure delivering a prompt or summary to the operator.
#[derive(Debug, thiserror::Error)]
#[error("send failed: {0}")]
pub struct PresentError(pub String);

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Resolves a raw identifier (`-100...` numeric or `@handle`) to a
/// stable channel handle.
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<ChannelRef, ResolveError>;
}

/// The transport's single-message copy primitive.
#[async_trait]
pub trait MessageCopier: Send + Sync {
    /// Copy one message from `source` into `destination`.
    async fn copy_message(
        &self,
        destination: &ChannelRef,
        source: &ChannelRef,
        message_id: i64,
    ) -> Result<(), CopyError>;
}

/// Renders prompts, confirmations and results back to the operator.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Send a text message, optionally with inline buttons (one per row).
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<(), PresentError>;

    /// Edit the last message sent to `chat_id`, falling back to a
    /// fresh send when there is nothing to edit.
    async fn edit_last_message(&self, chat_id: i64, text: &str) -> Result<(), PresentError>;
}
