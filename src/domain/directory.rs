//! Runtime registry of live connections, keyed by user.
//!
//! [`Directory`] maps each [`UserId`] to at most one [`ConnectionHandle`].
//! A newer connection for the same user replaces the older one, and a
//! disconnect only clears the slot if it still belongs to the
//! disconnecting connection.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use super::{ConnectionId, ServerEvent, UserId};

/// Sending side of one connection's outbound event queue.
///
/// Cheap to clone. Two handles are equal when they refer to the same
/// connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Creates a handle for a new connection and the receiver the
    /// connection task drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            connection_id: ConnectionId::new(),
            sender,
        };
        (handle, receiver)
    }

    /// Identifier of the underlying connection.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queues `event` for the connection without waiting.
    ///
    /// # Errors
    ///
    /// Returns the event back if the connection task has already gone away.
    pub fn send(&self, event: ServerEvent) -> Result<(), ServerEvent> {
        self.sender.send(event).map_err(|e| e.0)
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id
    }
}

impl Eq for ConnectionHandle {}

/// Concurrent map from user to their current connection.
///
/// The directory holds the only long-lived copy of each handle. Dropping
/// a superseded handle therefore closes that connection's queue.
#[derive(Debug, Default)]
pub struct Directory {
    handles: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl Directory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handle` to `user_id`, replacing any previous connection.
    pub async fn register(&self, user_id: UserId, handle: ConnectionHandle) {
        let connection_id = handle.connection_id();
        let previous = self.handles.write().await.insert(user_id, handle);
        if let Some(previous) = previous {
            tracing::debug!(
                %user_id,
                %connection_id,
                superseded = %previous.connection_id(),
                "connection superseded"
            );
        } else {
            tracing::debug!(%user_id, %connection_id, "connection registered");
        }
    }

    /// Clears `user_id`'s slot if it still holds the connection
    /// `connection_id`.
    ///
    /// Returns `true` if the slot was cleared. A stale disconnect from a
    /// superseded connection is a no-op.
    pub async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut map = self.handles.write().await;
        if map.get(&user_id).map(ConnectionHandle::connection_id) == Some(connection_id) {
            map.remove(&user_id);
            tracing::debug!(%user_id, %connection_id, "connection unregistered");
            true
        } else {
            false
        }
    }

    /// Returns the current connection of `user_id`, if any.
    pub async fn lookup(&self, user_id: UserId) -> Option<ConnectionHandle> {
        self.handles.read().await.get(&user_id).cloned()
    }

    /// Returns the number of connected users.
    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    /// Returns `true` if nobody is connected.
    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }
}
