//! Real-time events pushed to connected users.
//!
//! A [`ServerEvent`] is what the [`super::Notifier`] hands to a
//! connection. Its serde representation is the exact wire frame, so the
//! connection task only has to serialize it.

use serde::{Deserialize, Serialize};

use super::view::{MessageView, SessionView};

/// Kind of a real-time event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A session the recipient participates in was created.
    SessionCreated,
    /// A message was posted to a session the recipient participates in.
    MessageSent,
    /// A session the recipient participates in was closed.
    SessionClosed,
}

impl EventKind {
    /// Value of the `responseType` field on the wire.
    #[must_use]
    pub const fn response_type(self) -> &'static str {
        match self {
            Self::SessionCreated => "sessionCreated",
            Self::MessageSent => "messageSent",
            Self::SessionClosed => "sessionClosed",
        }
    }
}

/// Event frame delivered over a user's WebSocket.
///
/// Serializes as `{"responseType": "...", "<key>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "responseType", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Emitted to invited participants when a session is created.
    SessionCreated {
        /// The session rendered for the recipient.
        session: Box<SessionView>,
    },
    /// Emitted to every participant when a message is posted.
    MessageSent {
        /// The posted message.
        message: MessageView,
    },
    /// Emitted to every participant when a session is closed.
    SessionClosed {
        /// The session rendered for the recipient.
        session: Box<SessionView>,
    },
}

impl ServerEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::SessionCreated { .. } => EventKind::SessionCreated,
            Self::MessageSent { .. } => EventKind::MessageSent,
            Self::SessionClosed { .. } => EventKind::SessionClosed,
        }
    }
}
