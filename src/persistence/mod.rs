//! Persistence layer: the [`Store`] collaborator and its backends.
//!
//! The store is the source of truth for users, currencies, offers,
//! watchlists, sessions, participants and messages. Relationship
//! traversal is exposed as explicit queries keyed by session id or user
//! id. Two backends exist: [`MemoryStore`] (default, and used by tests)
//! and [`PostgresStore`] (`sqlx::PgPool`).
//!
//! Session read-modify-write operations ([`Store::append_message`] and
//! [`Store::close_session`]) are atomic per session in both backends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{
    Currency, Message, NewCurrency, NewMessage, Offer, OfferDraft, OfferId, Session, SessionId,
    User, UserId,
};
use crate::error::MarketError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result of [`Store::close_session`].
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// The session was open and is now closed.
    Closed(Session),
    /// The session was already closed; nothing changed.
    AlreadyClosed(Session),
}

impl CloseOutcome {
    /// The session as it is after the call.
    #[must_use]
    pub fn session(&self) -> &Session {
        match self {
            Self::Closed(s) | Self::AlreadyClosed(s) => s,
        }
    }
}

/// Persistence collaborator for the marketplace.
///
/// Every lookup of an unknown id fails with [`MarketError::NotFound`].
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Creates a user named `"New user {id}"` with rating 0.
    async fn create_user(&self) -> Result<User, MarketError>;

    /// Loads a user, including the live watchlist.
    async fn get_user(&self, user_id: UserId) -> Result<User, MarketError>;

    /// Changes a user's display name.
    async fn rename_user(&self, user_id: UserId, name: &str) -> Result<User, MarketError>;

    /// Records a rating and sets the user's rating to the mean of all
    /// ratings recorded for them.
    async fn add_rating(&self, user_id: UserId, rating: f64) -> Result<User, MarketError>;

    /// Adds an offer to a watchlist. [`MarketError::PermissionDenied`]
    /// if it is already there.
    async fn add_to_watchlist(&self, user_id: UserId, offer_id: OfferId)
    -> Result<(), MarketError>;

    /// Removes an offer from a watchlist. [`MarketError::PermissionDenied`]
    /// if it is not there.
    async fn remove_from_watchlist(
        &self,
        user_id: UserId,
        offer_id: OfferId,
    ) -> Result<(), MarketError>;

    /// Counts closed sessions in which the user has a participant row.
    async fn closed_session_count(&self, user_id: UserId) -> Result<u64, MarketError>;

    /// Registers a batch of currencies, returning them in input order.
    async fn add_currencies(&self, batch: Vec<NewCurrency>) -> Result<Vec<Currency>, MarketError>;

    /// Lists all currencies ordered by id.
    async fn list_currencies(&self) -> Result<Vec<Currency>, MarketError>;

    /// Creates an offer. Creator and both currencies must exist.
    async fn create_offer(&self, draft: OfferDraft) -> Result<Offer, MarketError>;

    /// Replaces every field of an existing offer.
    async fn update_offer(&self, offer_id: OfferId, draft: OfferDraft)
    -> Result<Offer, MarketError>;

    /// Loads an offer.
    async fn get_offer(&self, offer_id: OfferId) -> Result<Offer, MarketError>;

    /// Lists all offers ordered by id.
    async fn list_offers(&self) -> Result<Vec<Offer>, MarketError>;

    /// Lists offers posted by `user_id`, ordered by id.
    async fn offers_by_creator(&self, user_id: UserId) -> Result<Vec<Offer>, MarketError>;

    /// Creates an open session with one participant row per distinct id
    /// in `participants`. Owner, offer and participants must exist.
    async fn create_session(
        &self,
        owner_id: UserId,
        offer_id: OfferId,
        participants: &[UserId],
    ) -> Result<Session, MarketError>;

    /// Loads a session.
    async fn get_session(&self, session_id: SessionId) -> Result<Session, MarketError>;

    /// Participant rows of a session, in insertion order.
    async fn session_participants(&self, session_id: SessionId)
    -> Result<Vec<UserId>, MarketError>;

    /// Sessions the user owns or has a participant row in, ordered by id.
    async fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, MarketError>;

    /// Appends a message and, in the same atomic step, raises the
    /// session's `last_message_date` if the message is strictly later.
    async fn append_message(&self, message: NewMessage) -> Result<Message, MarketError>;

    /// Messages of a session ordered by timestamp, then id.
    async fn session_messages(&self, session_id: SessionId) -> Result<Vec<Message>, MarketError>;

    /// Closes a session if it is open.
    async fn close_session(&self, session_id: SessionId) -> Result<CloseOutcome, MarketError>;
}

/// Removes duplicate ids while keeping first-seen order.
pub(crate) fn dedup_preserving_order(ids: &[UserId]) -> Vec<UserId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
