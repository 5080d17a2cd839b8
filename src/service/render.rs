//! Per-viewer rendering of stored records.
//!
//! Everything viewer-dependent (self-exclusion from `sessionUsers`,
//! `sessionType`, `isOnWatchlist`) is computed here from a fresh read of
//! the store, so a rendering always reflects the viewer's current
//! watchlist.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::view::{MessageView, OfferView, SessionType, SessionView, UserView};
use crate::domain::{Message, Offer, Session, User, UserId};
use crate::error::MarketError;
use crate::persistence::Store;

/// Builds views of stored records for a given viewer.
#[derive(Debug, Clone)]
pub struct Renderer {
    store: Arc<dyn Store>,
}

impl Renderer {
    /// Creates a renderer reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Renders a user with their closed-session count.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn user(&self, user: &User) -> Result<UserView, MarketError> {
        let closed = self.store.closed_session_count(user.user_id).await?;
        Ok(UserView::new(user, closed))
    }

    /// Loads and renders a user.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for an unknown user.
    pub async fn user_by_id(&self, user_id: UserId) -> Result<UserView, MarketError> {
        let user = self.store.get_user(user_id).await?;
        self.user(&user).await
    }

    /// Renders an offer as seen by `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the creator no longer resolves.
    pub async fn offer(&self, offer: &Offer, viewer: &User) -> Result<OfferView, MarketError> {
        let creator = self.user_by_id(offer.creator).await?;
        Ok(OfferView::new(
            offer,
            creator,
            viewer.watchlist.contains(&offer.offer_id),
        ))
    }

    /// Renders a message with its sender.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the sender no longer resolves.
    pub async fn message(&self, message: &Message) -> Result<MessageView, MarketError> {
        let sender = self.user_by_id(message.sender_id).await?;
        Ok(MessageView::new(message, sender))
    }

    /// Renders `session` for `viewer`.
    ///
    /// The viewer is left out of `sessionUsers`; `sessionType` is
    /// `outcoming` for the owner and `incoming` for everybody else.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the viewer, offer or session
    /// does not resolve.
    pub async fn session(
        &self,
        session: &Session,
        viewer_id: UserId,
    ) -> Result<SessionView, MarketError> {
        let viewer = self.store.get_user(viewer_id).await?;

        let mut session_users = Vec::new();
        for user_id in self.store.session_participants(session.session_id).await? {
            if user_id != viewer_id {
                session_users.push(self.user_by_id(user_id).await?);
            }
        }

        let session_type = if session.owner_id == viewer_id {
            SessionType::Outcoming
        } else {
            SessionType::Incoming
        };

        let offer = self.store.get_offer(session.offer_id).await?;
        let session_offer = self.offer(&offer, &viewer).await?;

        // Senders repeat across a conversation; render each once.
        let mut senders: HashMap<UserId, UserView> = HashMap::new();
        let messages = self.store.session_messages(session.session_id).await?;
        let mut session_messages = Vec::with_capacity(messages.len());
        for message in &messages {
            let sender = match senders.get(&message.sender_id) {
                Some(view) => view.clone(),
                None => {
                    let view = self.user_by_id(message.sender_id).await?;
                    senders.insert(message.sender_id, view.clone());
                    view
                }
            };
            session_messages.push(MessageView::new(message, sender));
        }

        Ok(SessionView {
            session_id: session.session_id,
            session_users,
            session_type,
            session_state: session.state.code(),
            session_offer,
            session_messages,
            session_last_message: session.last_message_date,
        })
    }
}
