//! Session state machine.
//!
//! Interprets each classified [`Event`] against the sender's session:
//! mutates it, asks a question, or triggers the batch executor. The
//! per-user protocol is `NeedSource → Selecting → NeedDestination →
//! (run) → Selecting`, with source and destination retained across
//! runs and the selection cleared.

use crate::event::{ButtonAction, Command, Event, Incoming};
use crate::executor::BatchExecutor;
use crate::session::{SessionState, Session, SessionStore};
use crate::texts;
use crate::traits::{
    ChannelResolver, InlineButton, MessageCopier, PresentError, Presenter,
};
use crate::types::MessageRef;
use std::sync::Arc;

pub struct SessionMachine {
    store: SessionStore,
    resolver: Arc<dyn ChannelResolver>,
    presenter: Arc<dyn Presenter>,
    executor: BatchExecutor,
}

impl SessionMachine {
    pub fn new(
        resolver: Arc<dyn ChannelResolver>,
        copier: Arc<dyn MessageCopier>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            store: SessionStore::new(),
            executor: BatchExecutor::new(resolver.clone(), copier),
            resolver,
            presenter,
        }
    }

    /// Handle one classified event.
    ///
    /// Holds the user's session lock for the whole call, including an
    /// inline archive run, so a user's events are strictly serialized.
    pub async fn handle(&self, incoming: Incoming) {
        let cell = self.store.entry(incoming.user_id);
        let mut session = cell.lock().await;

        if let Err(e) = self.dispatch(&mut session, &incoming).await {
            tracing::error!(
                user_id = incoming.user_id,
                error = %e,
                "failed to answer user"
            );
        }
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        incoming: &Incoming,
    ) -> Result<(), PresentError> {
        let chat_id = incoming.chat_id;

        match &incoming.event {
            Event::Command(Command::Start) => {
                let buttons = [
                    InlineButton::new("Help", "help"),
                    InlineButton::new("How to use", "usage"),
                ];
                self.presenter
                    .send_text(chat_id, texts::WELCOME, &buttons)
                    .await
            }
            Event::Command(Command::Help) => {
                self.presenter.send_text(chat_id, texts::HELP, &[]).await
            }
            Event::Command(Command::Archive) => self.on_archive(session, chat_id).await,
            Event::Button(ButtonAction::Help) => {
                self.presenter.edit_last_message(chat_id, texts::HELP).await
            }
            Event::Button(ButtonAction::Usage) => {
                self.presenter
                    .edit_last_message(chat_id, texts::USAGE)
                    .await
            }
            Event::Button(ButtonAction::CancelArchive) => {
                session.cancel_archive();
                tracing::info!(user_id = incoming.user_id, "archive cancelled");
                self.presenter
                    .edit_last_message(chat_id, texts::CANCELLED)
                    .await
            }
            Event::Button(ButtonAction::RawIdentifier(identifier)) => {
                // Destination shortcut; only meaningful while a
                // destination is being requested.
                if session.state == SessionState::NeedDestination {
                    self.on_destination(session, incoming, identifier).await
                } else {
                    self.hint_for_state(session, chat_id).await
                }
            }
            Event::Forwarded {
                origin_chat_id,
                origin_message_id,
            } => {
                self.on_forward(session, incoming, *origin_chat_id, *origin_message_id)
                    .await
            }
            Event::Text(text) => self.on_text(session, incoming, text).await,
        }
    }

    async fn on_text(
        &self,
        session: &mut Session,
        incoming: &Incoming,
        text: &str,
    ) -> Result<(), PresentError> {
        let chat_id = incoming.chat_id;

        match session.state {
            SessionState::NeedSource => {
                if !crate::event::looks_like_channel_identifier(text) {
                    return self
                        .presenter
                        .send_text(chat_id, texts::NEED_SOURCE_HINT, &[])
                        .await;
                }
                match self.resolver.resolve(text.trim()).await {
                    Ok(source) => {
                        tracing::info!(
                            user_id = incoming.user_id,
                            channel_id = source.id,
                            "source channel confirmed"
                        );
                        let confirmation = texts::source_confirmed(source.label());
                        session.set_source(source);
                        self.presenter.send_text(chat_id, &confirmation, &[]).await
                    }
                    Err(e) => {
                        tracing::warn!(
                            user_id = incoming.user_id,
                            identifier = text,
                            error = %e,
                            "source resolution failed"
                        );
                        self.presenter
                            .send_text(chat_id, texts::SOURCE_RETRY, &[])
                            .await
                    }
                }
            }
            SessionState::Selecting => {
                self.presenter
                    .send_text(chat_id, texts::SELECTING_HINT, &[])
                    .await
            }
            SessionState::NeedDestination => {
                if crate::event::looks_like_channel_identifier(text) {
                    self.on_destination(session, incoming, text.trim()).await
                } else {
                    self.presenter
                        .send_text(chat_id, texts::ASK_DESTINATION, &[])
                        .await
                }
            }
        }
    }

    async fn on_forward(
        &self,
        session: &mut Session,
        incoming: &Incoming,
        origin_chat_id: Option<i64>,
        origin_message_id: Option<i64>,
    ) -> Result<(), PresentError> {
        let chat_id = incoming.chat_id;

        if session.state != SessionState::Selecting {
            return self.hint_for_state(session, chat_id).await;
        }

        // A forward with no message id can never be located by the
        // executor; report it instead of silently dropping it.
        let Some(message_id) = origin_message_id else {
            tracing::warn!(
                user_id = incoming.user_id,
                "forward without usable attribution rejected"
            );
            return self
                .presenter
                .send_text(chat_id, texts::SELECTION_UNUSABLE, &[])
                .await;
        };

        let message = MessageRef {
            origin_chat_id,
            message_id,
        };
        let count = session.push_selection(message);

        tracing::info!(
            user_id = incoming.user_id,
            message_id,
            attributed = message.attributed(),
            count,
            "message selected"
        );

        let reply = if message.attributed() {
            texts::selection_count(count)
        } else {
            // Best-effort capture: kept, but flagged as ambiguous
            texts::selection_count_unverified(count)
        };
        self.presenter.send_text(chat_id, &reply, &[]).await
    }

    async fn on_archive(
        &self,
        session: &mut Session,
        chat_id: i64,
    ) -> Result<(), PresentError> {
        if session.selected.is_empty() {
            return self
                .presenter
                .send_text(chat_id, texts::NOTHING_SELECTED, &[])
                .await;
        }

        session.state = SessionState::NeedDestination;

        // Destination is requested fresh on every cycle. A retained
        // destination is only offered as an explicit shortcut button.
        let mut buttons = vec![InlineButton::new("Cancel", "cancel_archive")];
        if let Some(previous) = &session.destination {
            buttons.push(InlineButton::new(
                texts::destination_shortcut(previous.label()),
                previous.raw.clone(),
            ));
        }

        self.presenter
            .send_text(chat_id, texts::ASK_DESTINATION, &buttons)
            .await
    }

    async fn on_destination(
        &self,
        session: &mut Session,
        incoming: &Incoming,
        identifier: &str,
    ) -> Result<(), PresentError> {
        let chat_id = incoming.chat_id;

        let destination = match self.resolver.resolve(identifier).await {
            Ok(destination) => destination,
            Err(e) => {
                tracing::warn!(
                    user_id = incoming.user_id,
                    identifier,
                    error = %e,
                    "destination resolution failed"
                );
                return self
                    .presenter
                    .send_text(chat_id, texts::DESTINATION_RETRY, &[])
                    .await;
            }
        };

        let Some(source) = session.source.clone() else {
            // Unreachable through normal flow: selection is only
            // non-empty while a source is set.
            session.cancel_archive();
            return self
                .presenter
                .send_text(chat_id, texts::NEED_SOURCE_HINT, &[])
                .await;
        };

        self.presenter
            .send_text(chat_id, &texts::run_started(session.selected.len()), &[])
            .await?;

        tracing::info!(
            user_id = incoming.user_id,
            source_id = source.id,
            destination_id = destination.id,
            selected = session.selected.len(),
            "starting archive run"
        );

        match self
            .executor
            .run(&source, &destination, &session.selected)
            .await
        {
            Ok(result) => {
                session.finish_run(destination);
                self.presenter
                    .send_text(chat_id, &texts::run_summary(&result), &[])
                    .await
            }
            Err(e) => {
                // Systemic failure: selection kept so the user may retry
                tracing::error!(
                    user_id = incoming.user_id,
                    error = %e,
                    "archive run aborted"
                );
                self.presenter
                    .send_text(chat_id, &texts::systemic_failure(&e), &[])
                    .await
            }
        }
    }

    async fn hint_for_state(
        &self,
        session: &Session,
        chat_id: i64,
    ) -> Result<(), PresentError> {
        let hint = match session.state {
            SessionState::NeedSource => texts::NEED_SOURCE_HINT,
            SessionState::Selecting => texts::SELECTING_HINT,
            SessionState::NeedDestination => texts::ASK_DESTINATION,
        };
        self.presenter.send_text(chat_id, hint, &[]).await
    }

    #[cfg(test)]
    fn store(&self) -> &SessionStore {
        &self.store
    }
}
