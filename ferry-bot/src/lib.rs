//! Ferry - a Telegram bot that relays a hand-picked batch of messages
//! from a source channel into a destination channel.
//!
//! ## Architecture
//!
//! Updates are classified once at the transport boundary, then driven
//! through a per-user session state machine; a confirmed destination
//! triggers the batch executor, which copies the selection in order
//! and tallies per-message outcomes.
//!
//! ```text
//! Telegram ── getUpdates ──► event classification ──► SessionMachine
//!     ▲                                                    │
//!     │                                              SessionStore
//!     └── sendMessage / copyMessage ◄── BatchExecutor ◄────┘
//! ```

#![warn(clippy::all)]

pub mod event;
pub mod executor;
pub mod machine;
pub mod session;
pub mod telegram;
pub mod texts;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use event::{ButtonAction, Command, Event, Incoming};
pub use executor::BatchExecutor;
pub use machine::SessionMachine;
pub use session::{Session, SessionState, SessionStore};
pub use telegram::{AllowList, TelegramApi};
pub use traits::{
    ChannelResolver, CopyError, InlineButton, MessageCopier, PresentError, Presenter,
    ResolveError, TransferError,
};
pub use types::{ChannelRef, MessageRef, TransferResult};

use ferry_common::Config;
use std::sync::Arc;

/// Start the bot: verify credentials, then poll for updates until the
/// process is stopped.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let api = Arc::new(TelegramApi::new(
        config.bot.token.clone(),
        config.bot.api_base.clone(),
    ));
    api.verify_token().await?;

    let machine = Arc::new(SessionMachine::new(
        api.clone(),
        api.clone(),
        api.clone(),
    ));
    let allow = AllowList::new(config.bot.allowed_users.clone());

    // Each update runs on its own task; the SessionStore's per-user
    // locks keep one user's events serialized while a long batch for
    // another user is in flight.
    let poll = telegram::poll_loop(api, allow, move |incoming| {
        let machine = machine.clone();
        tokio::spawn(async move {
            machine.handle(incoming).await;
        });
    });

    tokio::select! {
        result = poll => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}
