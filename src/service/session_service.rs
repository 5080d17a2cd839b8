//! Session service: negotiation sessions and their real-time fan-out.
//!
//! Every mutation follows the same pattern: validate → persist through
//! the [`Store`] → render per recipient → hand events to the
//! [`Notifier`]. Delivery problems are logged and never turn a persisted
//! change into an error.
//!
//! Persisting and queuing happen under one per-session lock, so every
//! recipient sees a session's events in the order they were stored.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::render::Renderer;
use crate::domain::view::{MessageView, SessionView};
use crate::domain::{NewMessage, Notifier, OfferId, ServerEvent, Session, SessionId, UserId};
use crate::error::MarketError;
use crate::persistence::{CloseOutcome, Store};

/// First message posted into a freshly created session.
#[derive(Debug, Clone)]
pub struct InitialMessage {
    /// Author.
    pub sender_id: UserId,
    /// Caller-supplied timestamp in UTC.
    pub message_date: DateTime<Utc>,
    /// Message body.
    pub text: String,
}

/// Everything needed to open a negotiation.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// User starting the negotiation.
    pub owner_id: UserId,
    /// Users attached to the session. By convention the caller includes
    /// the owner; it is not added automatically.
    pub participant_ids: Vec<UserId>,
    /// Offer under negotiation.
    pub offer_id: OfferId,
    /// Message posted right after creation.
    pub initial_message: InitialMessage,
}

/// Orchestrates session creation, messaging, closing and listing.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    notifier: Notifier,
    renderer: Renderer,
    message_max_len: usize,
    session_locks: Arc<Mutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl SessionService {
    /// Creates a new `SessionService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notifier: Notifier, message_max_len: usize) -> Self {
        let renderer = Renderer::new(Arc::clone(&store));
        Self {
            store,
            notifier,
            renderer,
            message_max_len,
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the notifier used for fan-out.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Opens a session, notifies the invited participants, then posts the
    /// initial message.
    ///
    /// Every participant other than the owner receives `sessionCreated`
    /// rendered for them. Returns the session rendered for the owner,
    /// including the initial message.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Validation`] if no participant besides the owner
    ///   is given or the initial message is too long.
    /// - [`MarketError::NotFound`] if the owner, a participant, the
    ///   initial sender or the offer does not resolve.
    pub async fn create_session(&self, request: NewSession) -> Result<SessionView, MarketError> {
        let NewSession {
            owner_id,
            participant_ids,
            offer_id,
            initial_message,
        } = request;

        if !participant_ids.iter().any(|&id| id != owner_id) {
            return Err(MarketError::Validation(
                "a session needs at least one participant besides the owner".to_string(),
            ));
        }
        self.check_text(&initial_message.text)?;
        self.store.get_user(initial_message.sender_id).await?;

        let session = self
            .store
            .create_session(owner_id, offer_id, &participant_ids)
            .await?;
        tracing::info!(
            session_id = %session.session_id,
            %owner_id,
            %offer_id,
            participants = participant_ids.len(),
            "session created"
        );

        let _guard = self.lock_session(session.session_id).await;
        let recipients = self.store.session_participants(session.session_id).await?;
        let deliveries = self
            .render_for(&session, recipients.into_iter().filter(|&id| id != owner_id))
            .await
            .into_iter()
            .map(|(user_id, view)| {
                (
                    user_id,
                    ServerEvent::SessionCreated {
                        session: Box::new(view),
                    },
                )
            });
        let delivered = self.notifier.notify_each(deliveries).await;
        tracing::debug!(session_id = %session.session_id, delivered, "sessionCreated fanned out");

        self.append_and_notify(NewMessage {
            sender_id: initial_message.sender_id,
            session_id: session.session_id,
            message_date: initial_message.message_date,
            text: initial_message.text,
        })
        .await?;

        let session = self.store.get_session(session.session_id).await?;
        self.renderer.session(&session, owner_id).await
    }

    /// Appends a message and notifies every participant, sender included.
    ///
    /// The session's `last_message_date` only moves forward.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Validation`] if the text exceeds the configured limit.
    /// - [`MarketError::NotFound`] if the session or sender does not resolve.
    pub async fn post_message(&self, message: NewMessage) -> Result<MessageView, MarketError> {
        self.check_text(&message.text)?;
        let _guard = self.lock_session(message.session_id).await;
        self.append_and_notify(message).await
    }

    /// Stores a message and queues `messageSent`. Callers hold the
    /// session lock.
    async fn append_and_notify(&self, message: NewMessage) -> Result<MessageView, MarketError> {
        let message = self.store.append_message(message).await?;
        tracing::debug!(
            session_id = %message.session_id,
            message_id = %message.message_id,
            sender_id = %message.sender_id,
            "message stored"
        );

        let view = self.renderer.message(&message).await?;
        let recipients = self.store.session_participants(message.session_id).await?;
        let event = ServerEvent::MessageSent {
            message: view.clone(),
        };
        let delivered = self.notifier.notify(&recipients, &event).await;
        tracing::debug!(session_id = %message.session_id, delivered, "messageSent fanned out");

        Ok(view)
    }

    /// Closes a session and notifies every participant.
    ///
    /// Closing an already closed session succeeds without notifying anyone.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the session does not resolve.
    pub async fn close_session(&self, session_id: SessionId) -> Result<CloseOutcome, MarketError> {
        let _guard = self.lock_session(session_id).await;
        let outcome = self.store.close_session(session_id).await?;
        if let CloseOutcome::AlreadyClosed(_) = outcome {
            tracing::debug!(%session_id, "session already closed");
            return Ok(outcome);
        }
        tracing::info!(%session_id, "session closed");

        let recipients = self.store.session_participants(session_id).await?;
        let deliveries = self
            .render_for(outcome.session(), recipients)
            .await
            .into_iter()
            .map(|(user_id, view)| {
                (
                    user_id,
                    ServerEvent::SessionClosed {
                        session: Box::new(view),
                    },
                )
            });
        let delivered = self.notifier.notify_each(deliveries).await;
        tracing::debug!(%session_id, delivered, "sessionClosed fanned out");

        Ok(outcome)
    }

    /// Lists the sessions `user_id` owns or participates in, rendered for
    /// them and ordered by session id.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the user does not resolve.
    pub async fn list_sessions(&self, user_id: UserId) -> Result<Vec<SessionView>, MarketError> {
        self.store.get_user(user_id).await?;
        let sessions = self.store.sessions_for_user(user_id).await?;
        let mut views = Vec::with_capacity(sessions.len());
        for session in &sessions {
            views.push(self.renderer.session(session, user_id).await?);
        }
        Ok(views)
    }

    /// Serializes store writes and event queuing for one session.
    async fn lock_session(&self, session_id: SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            Arc::clone(locks.entry(session_id).or_default())
        };
        lock.lock_owned().await
    }

    fn check_text(&self, text: &str) -> Result<(), MarketError> {
        let len = text.chars().count();
        if len > self.message_max_len {
            return Err(MarketError::Validation(format!(
                "message text is {len} characters, limit is {}",
                self.message_max_len
            )));
        }
        Ok(())
    }

    /// Renders `session` for each connected recipient. Recipients that are
    /// offline or fail to render are skipped.
    async fn render_for<I>(&self, session: &Session, recipients: I) -> Vec<(UserId, SessionView)>
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut rendered = Vec::new();
        for user_id in recipients {
            if !self.notifier.is_connected(user_id).await {
                continue;
            }
            match self.renderer.session(session, user_id).await {
                Ok(view) => rendered.push((user_id, view)),
                Err(err) => tracing::warn!(
                    session_id = %session.session_id,
                    %user_id,
                    error = %err,
                    "failed to render session for recipient"
                ),
            }
        }
        rendered
    }
}
