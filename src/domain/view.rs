//! Viewer-specific renderings of marketplace records.
//!
//! These are the JSON shapes sent over REST and the real-time channel.
//! Key names follow the established client contract, which mixes
//! camelCase (sessions, messages, offers) and snake_case (users).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::timestamp;
use super::{CurrencyId, MessageId, OfferId, SessionId, UserId};
use super::{Currency, Message, Offer, User};

/// Public rendering of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
    /// Mean rating.
    pub user_rating: f64,
    /// Number of closed sessions the user participated in.
    pub closed_sessions: u64,
}

impl UserView {
    /// Renders `user` with the given closed-session count.
    #[must_use]
    pub fn new(user: &User, closed_sessions: u64) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name.clone(),
            user_rating: user.user_rating,
            closed_sessions,
        }
    }
}

/// Rendering of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyView {
    /// Currency identifier.
    pub currency_id: CurrencyId,
    /// Display name.
    pub currency_name: String,
    /// Capitalised code.
    pub currency_capital_name: String,
    /// Symbol glyph.
    pub unicode_symbol: String,
    /// Colour as hex.
    pub color_hex: String,
}

impl From<&Currency> for CurrencyView {
    fn from(c: &Currency) -> Self {
        Self {
            currency_id: c.currency_id,
            currency_name: c.name.clone(),
            currency_capital_name: c.capital_name.clone(),
            unicode_symbol: c.unicode_symbol.clone(),
            color_hex: c.color_hex.clone(),
        }
    }
}

/// Rendering of an offer for a specific viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferView {
    /// Offer identifier.
    pub offer_id: OfferId,
    /// Currency given.
    pub from_currency_id: CurrencyId,
    /// Currency wanted.
    pub to_currency_id: CurrencyId,
    /// Amount given.
    pub from_amount: f64,
    /// Amount wanted.
    pub to_amount: f64,
    /// Quoted exchange rate.
    pub exchange_rate: f64,
    /// Posting user.
    pub creator: UserView,
    /// Whether the viewer has this offer on their watchlist.
    pub is_on_watchlist: bool,
}

impl OfferView {
    /// Renders `offer` for a viewer whose watchlist membership is already known.
    #[must_use]
    pub fn new(offer: &Offer, creator: UserView, is_on_watchlist: bool) -> Self {
        Self {
            offer_id: offer.offer_id,
            from_currency_id: offer.from_currency,
            to_currency_id: offer.to_currency,
            from_amount: offer.from_amount,
            to_amount: offer.to_amount,
            exchange_rate: offer.exchange_rate,
            creator,
            is_on_watchlist,
        }
    }
}

/// Rendering of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// Message identifier.
    pub message_id: MessageId,
    /// Timestamp, `YYYY-MM-DD HH:MM:SS`.
    #[serde(with = "timestamp::wire")]
    #[schema(value_type = String, example = "2024-01-01 10:00:00")]
    pub message_date: DateTime<Utc>,
    /// Message body.
    pub message_text: String,
    /// Author.
    pub message_sender: UserView,
    /// Owning session.
    pub message_session_id: SessionId,
}

impl MessageView {
    /// Renders `message` with its already-rendered sender.
    #[must_use]
    pub fn new(message: &Message, sender: UserView) -> Self {
        Self {
            message_id: message.message_id,
            message_date: message.message_date,
            message_text: message.text.clone(),
            message_sender: sender,
            message_session_id: message.session_id,
        }
    }
}

/// Whether the viewer started the session or was invited to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// The viewer owns the session.
    Outcoming,
    /// The viewer was invited.
    Incoming,
}

/// Rendering of a session for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session identifier.
    pub session_id: SessionId,
    /// Participants other than the viewer.
    pub session_users: Vec<UserView>,
    /// Ownership from the viewer's side.
    pub session_type: SessionType,
    /// 1 while open, 0 once closed.
    pub session_state: i16,
    /// Offer under negotiation, rendered for the viewer.
    pub session_offer: OfferView,
    /// All messages, oldest first.
    pub session_messages: Vec<MessageView>,
    /// Latest message timestamp.
    #[serde(with = "timestamp::wire")]
    #[schema(value_type = String, example = "2024-01-01 10:00:00")]
    pub session_last_message: DateTime<Utc>,
}
