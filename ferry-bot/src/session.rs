//! Per-user session records and the concurrent session store.

use crate::types::{ChannelRef, MessageRef};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where a session currently is in the selection/archive protocol.
///
/// The run itself is transient: the executor is invoked inline from
/// the `NeedDestination` handler and the session returns to
/// `Selecting` when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for a source channel identifier
    #[default]
    NeedSource,
    /// Source confirmed; accumulating forwarded messages
    Selecting,
    /// Archive triggered; waiting for a destination identifier
    NeedDestination,
}

/// Mutable per-user record tracking selection/archive progress.
///
/// Created empty on the first event from a user and kept for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: SessionState,
    /// Set once the source is confirmed; kept across archive runs
    pub source: Option<ChannelRef>,
    /// Set on each successful run; offered as a shortcut next cycle
    /// but never silently reused
    pub destination: Option<ChannelRef>,
    /// Selected messages in arrival order; arrival order is the
    /// replication order
    pub selected: Vec<MessageRef>,
}

impl Session {
    /// Confirm the source channel and start selecting.
    pub fn set_source(&mut self, source: ChannelRef) {
        self.source = Some(source);
        self.state = SessionState::Selecting;
    }

    /// Append a selected message, returning the running count.
    ///
    /// Only meaningful while a source is set; the state machine never
    /// calls this in `NeedSource`.
    pub fn push_selection(&mut self, message: MessageRef) -> usize {
        debug_assert!(self.source.is_some());
        self.selected.push(message);
        self.selected.len()
    }

    /// Abort a pending archive: clear the selection and fall back to
    /// selecting (or to `NeedSource` if no source was ever confirmed).
    pub fn cancel_archive(&mut self) {
        self.selected.clear();
        self.state = if self.source.is_some() {
            SessionState::Selecting
        } else {
            SessionState::NeedSource
        };
    }

    /// Record a completed run: remember the destination, clear the
    /// selection, return to selecting against the same channel pair.
    pub fn finish_run(&mut self, destination: ChannelRef) {
        self.destination = Some(destination);
        self.selected.clear();
        self.state = SessionState::Selecting;
    }
}

/// Concurrent session map keyed by user id, with per-user locking.
///
/// A handler locks the user's session for its full read-modify-write,
/// including an inline archive run, so events for one user are
/// strictly serialized while other users proceed in parallel.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<i64, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session cell for a user, creating an empty session on
    /// first contact.
    pub fn entry(&self, user_id: i64) -> Arc<Mutex<Session>> {
        self.sessions
            .entry(user_id)
            .or_default()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: i64) -> ChannelRef {
        ChannelRef {
            id,
            raw: id.to_string(),
            title: None,
        }
    }

    #[test]
    fn new_session_needs_source() {
        let session = Session::default();
        assert_eq!(session.state, SessionState::NeedSource);
        assert!(session.source.is_none());
        assert!(session.selected.is_empty());
    }

    #[test]
    fn set_source_enters_selecting() {
        let mut session = Session::default();
        session.set_source(channel(-100123));
        assert_eq!(session.state, SessionState::Selecting);
        assert_eq!(session.source.as_ref().map(|c| c.id), Some(-100123));
    }

    #[test]
    fn push_selection_counts_in_order() {
        let mut session = Session::default();
        session.set_source(channel(-100123));

        for (i, mid) in [10, 11, 12].iter().enumerate() {
            let count = session.push_selection(MessageRef {
                origin_chat_id: Some(-100123),
                message_id: *mid,
            });
            assert_eq!(count, i + 1);
        }

        let order: Vec<i64> = session.selected.iter().map(|m| m.message_id).collect();
        assert_eq!(order, vec![10, 11, 12]);
    }

    #[test]
    fn cancel_clears_selection_and_returns_to_selecting() {
        let mut session = Session::default();
        session.set_source(channel(-100123));
        session.push_selection(MessageRef {
            origin_chat_id: Some(-100123),
            message_id: 10,
        });
        session.state = SessionState::NeedDestination;

        session.cancel_archive();
        assert_eq!(session.state, SessionState::Selecting);
        assert!(session.selected.is_empty());
        assert!(session.source.is_some());
    }

    #[test]
    fn cancel_without_source_returns_to_need_source() {
        let mut session = Session::default();
        session.cancel_archive();
        assert_eq!(session.state, SessionState::NeedSource);
    }

    #[test]
    fn finish_run_keeps_handles_clears_selection() {
        let mut session = Session::default();
        session.set_source(channel(-100123));
        session.push_selection(MessageRef {
            origin_chat_id: Some(-100123),
            message_id: 10,
        });
        session.state = SessionState::NeedDestination;

        session.finish_run(channel(-100999));

        assert_eq!(session.state, SessionState::Selecting);
        assert!(session.selected.is_empty());
        assert_eq!(session.source.as_ref().map(|c| c.id), Some(-100123));
        assert_eq!(session.destination.as_ref().map(|c| c.id), Some(-100999));
    }

    #[tokio::test]
    async fn store_creates_one_session_per_user() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let a = store.entry(1);
        let b = store.entry(1);
        let _c = store.entry(2);
        assert_eq!(store.len(), 2);

        // Same user gets the same cell
        a.lock().await.set_source(channel(-5));
        assert_eq!(b.lock().await.state, SessionState::Selecting);
    }
}
