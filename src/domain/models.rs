//! Persisted marketplace records.
//!
//! These are plain values returned by the [`crate::persistence::Store`].
//! Rendering them for a particular viewer happens in the service layer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{CurrencyId, MessageId, OfferId, SessionId, UserId};

/// A marketplace participant.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
    /// Mean of all submitted ratings (0 when none).
    pub user_rating: f64,
    /// Offers this user keeps on their watchlist.
    pub watchlist: BTreeSet<OfferId>,
}

/// A currency that offers can be denominated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// Currency identifier.
    pub currency_id: CurrencyId,
    /// Display name (e.g. `"dollar"`).
    pub name: String,
    /// Capitalised code (e.g. `"USD"`).
    pub capital_name: String,
    /// Symbol glyph (e.g. `"$"`).
    pub unicode_symbol: String,
    /// Colour used by clients, as hex.
    pub color_hex: String,
}

/// Fields required to register a currency.
#[derive(Debug, Clone)]
pub struct NewCurrency {
    /// Display name.
    pub name: String,
    /// Capitalised code.
    pub capital_name: String,
    /// Symbol glyph.
    pub unicode_symbol: String,
    /// Colour as hex.
    pub color_hex: String,
}

/// An exchange offer posted by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    /// Offer identifier.
    pub offer_id: OfferId,
    /// Currency the creator gives.
    pub from_currency: CurrencyId,
    /// Currency the creator wants.
    pub to_currency: CurrencyId,
    /// Amount given.
    pub from_amount: f64,
    /// Amount wanted.
    pub to_amount: f64,
    /// Quoted exchange rate.
    pub exchange_rate: f64,
    /// User that posted the offer.
    pub creator: UserId,
}

/// Fields of an offer as supplied on create or edit.
#[derive(Debug, Clone)]
pub struct OfferDraft {
    /// Posting user.
    pub creator: UserId,
    /// Currency given.
    pub from_currency: CurrencyId,
    /// Currency wanted.
    pub to_currency: CurrencyId,
    /// Amount given.
    pub from_amount: f64,
    /// Amount wanted.
    pub to_amount: f64,
    /// Quoted exchange rate.
    pub exchange_rate: f64,
}

/// Lifecycle state of a negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepting messages.
    Open,
    /// Negotiation finished. Terminal.
    Closed,
}

impl SessionState {
    /// Numeric code used on the wire and in the database (1 open, 0 closed).
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Open => 1,
            Self::Closed => 0,
        }
    }

    /// Inverse of [`SessionState::code`]. Any non-zero code is open.
    #[must_use]
    pub const fn from_code(code: i16) -> Self {
        if code == 0 { Self::Closed } else { Self::Open }
    }
}

/// A negotiation thread bound to one offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// Open or closed.
    pub state: SessionState,
    /// Offer under negotiation.
    pub offer_id: OfferId,
    /// User that started the negotiation.
    pub owner_id: UserId,
    /// Latest message timestamp seen (never decreases).
    pub last_message_date: DateTime<Utc>,
}

/// A chat message inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message identifier.
    pub message_id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Owning session.
    pub session_id: SessionId,
    /// Caller-supplied timestamp, normalised to UTC.
    pub message_date: DateTime<Utc>,
    /// Message body.
    pub text: String,
}

/// A message as submitted, before it is assigned an id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Target session.
    pub session_id: SessionId,
    /// Caller-supplied timestamp in UTC.
    pub message_date: DateTime<Utc>,
    /// Message body.
    pub text: String,
}
