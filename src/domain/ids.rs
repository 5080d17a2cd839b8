//! Type-safe numeric identifiers.
//!
//! Every persisted record is keyed by a database-assigned `i64`. Each
//! record kind gets its own newtype so that, for example, a [`UserId`]
//! can never be passed where a [`SessionId`] is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            utoipa::ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw database identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of a marketplace user.
    UserId
);
numeric_id!(
    /// Identifier of a currency.
    CurrencyId
);
numeric_id!(
    /// Identifier of an exchange offer.
    OfferId
);
numeric_id!(
    /// Identifier of a negotiation session.
    SessionId
);
numeric_id!(
    /// Identifier of a chat message.
    MessageId
);

/// Identifier of one live WebSocket connection.
///
/// Generated when the connection is accepted. The directory compares
/// connection ids, not users, when deciding whether a disconnect still
/// owns the user's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_number() {
        assert_eq!(UserId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&SessionId::new(7)).unwrap_or_default();
        assert_eq!(json, "7");

        let Ok(parsed) = serde_json::from_str::<OfferId>("10") else {
            panic!("deserialization failed");
        };
        assert_eq!(parsed, OfferId::new(10));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![SessionId::new(3), SessionId::new(1), SessionId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![SessionId::new(1), SessionId::new(2), SessionId::new(3)]);
    }
}
