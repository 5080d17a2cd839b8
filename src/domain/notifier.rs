//! Best-effort fan-out of [`ServerEvent`]s to connected users.
//!
//! [`Notifier`] owns a reference to the [`Directory`]. For each recipient
//! it looks up the current connection and queues the event on it. Users
//! without a connection are skipped; nothing is stored for later replay.
//!
//! Queuing never waits on the socket, so a slow client only delays its
//! own connection task. Events queued on one connection are written in
//! the order they were queued.

use std::sync::Arc;

use super::{Directory, ServerEvent, UserId};

/// Delivers events to whichever recipients are currently connected.
#[derive(Debug, Clone)]
pub struct Notifier {
    directory: Arc<Directory>,
}

impl Notifier {
    /// Creates a notifier backed by `directory`.
    #[must_use]
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }

    /// Returns the directory this notifier resolves connections from.
    #[must_use]
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Sends the same `event` to every user in `recipients`.
    ///
    /// Returns the number of connections the event was queued on.
    pub async fn notify(&self, recipients: &[UserId], event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for &user_id in recipients {
            if self.deliver(user_id, event.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Sends a recipient-specific event to each user.
    ///
    /// Returns the number of connections an event was queued on.
    pub async fn notify_each<I>(&self, deliveries: I) -> usize
    where
        I: IntoIterator<Item = (UserId, ServerEvent)>,
    {
        let mut delivered = 0;
        for (user_id, event) in deliveries {
            if self.deliver(user_id, event).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Returns `true` if `user_id` currently has a live connection.
    pub async fn is_connected(&self, user_id: UserId) -> bool {
        self.directory.lookup(user_id).await.is_some()
    }

    async fn deliver(&self, user_id: UserId, event: ServerEvent) -> bool {
        let kind = event.kind().response_type();
        // The directory lock is released before the handoff.
        let Some(handle) = self.directory.lookup(user_id).await else {
            tracing::trace!(%user_id, kind, "recipient not connected, skipping");
            return false;
        };
        match handle.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(
                    %user_id,
                    connection_id = %handle.connection_id(),
                    kind,
                    "recipient connection closed, dropping event"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ConnectionHandle;
    use crate::domain::test_support::message_view;

    fn event(text: &str) -> ServerEvent {
        ServerEvent::MessageSent {
            message: message_view(1, text),
        }
    }

    fn make_notifier() -> Notifier {
        Notifier::new(Arc::new(Directory::new()))
    }

    #[tokio::test]
    async fn notify_without_connections_returns_zero() {
        let notifier = make_notifier();
        let count = notifier
            .notify(&[UserId::new(1), UserId::new(2)], &event("hi"))
            .await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn connected_recipients_receive_event() {
        let notifier = make_notifier();
        let (h2, mut rx2) = ConnectionHandle::channel();
        notifier.directory().register(UserId::new(2), h2).await;

        let count = notifier
            .notify(&[UserId::new(1), UserId::new(2)], &event("hi"))
            .await;
        assert_eq!(count, 1);

        let Some(received) = rx2.recv().await else {
            panic!("expected an event");
        };
        assert_eq!(received, event("hi"));
    }

    #[tokio::test]
    async fn dead_connection_does_not_block_others() {
        let notifier = make_notifier();
        let (h1, rx1) = ConnectionHandle::channel();
        let (h2, mut rx2) = ConnectionHandle::channel();
        notifier.directory().register(UserId::new(1), h1).await;
        notifier.directory().register(UserId::new(2), h2).await;
        drop(rx1);

        let count = notifier
            .notify(&[UserId::new(1), UserId::new(2)], &event("hi"))
            .await;
        assert_eq!(count, 1);
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn notify_each_sends_per_recipient_payloads() {
        let notifier = make_notifier();
        let (h1, mut rx1) = ConnectionHandle::channel();
        let (h2, mut rx2) = ConnectionHandle::channel();
        notifier.directory().register(UserId::new(1), h1).await;
        notifier.directory().register(UserId::new(2), h2).await;

        let count = notifier
            .notify_each([
                (UserId::new(1), event("for one")),
                (UserId::new(2), event("for two")),
            ])
            .await;
        assert_eq!(count, 2);
        assert_eq!(rx1.recv().await, Some(event("for one")));
        assert_eq!(rx2.recv().await, Some(event("for two")));
    }

    #[tokio::test]
    async fn per_recipient_order_follows_call_order() {
        let notifier = make_notifier();
        let (h1, mut rx1) = ConnectionHandle::channel();
        notifier.directory().register(UserId::new(1), h1).await;

        notifier.notify(&[UserId::new(1)], &event("first")).await;
        notifier.notify(&[UserId::new(1)], &event("second")).await;

        assert_eq!(rx1.recv().await, Some(event("first")));
        assert_eq!(rx1.recv().await, Some(event("second")));
    }

    #[tokio::test]
    async fn is_connected_tracks_directory() {
        let notifier = make_notifier();
        assert!(!notifier.is_connected(UserId::new(1)).await);
        let (h1, _rx1) = ConnectionHandle::channel();
        notifier.directory().register(UserId::new(1), h1).await;
        assert!(notifier.is_connected(UserId::new(1)).await);
    }
}
