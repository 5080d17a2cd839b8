//! Domain layer: identifiers, records, views, and the real-time fan-out.
//!
//! The [`Directory`] tracks who is connected, the [`Notifier`] pushes
//! [`ServerEvent`]s to connected users, and the remaining modules define
//! the records and their per-viewer renderings.

pub mod directory;
pub mod event;
pub mod ids;
pub mod models;
pub mod notifier;
pub mod timestamp;
pub mod view;

pub use directory::{ConnectionHandle, Directory};
pub use event::{EventKind, ServerEvent};
pub use ids::{ConnectionId, CurrencyId, MessageId, OfferId, SessionId, UserId};
pub use models::{
    Currency, Message, NewCurrency, NewMessage, Offer, OfferDraft, Session, SessionState, User,
};
pub use notifier::Notifier;
pub use view::{CurrencyView, MessageView, OfferView, SessionType, SessionView, UserView};
