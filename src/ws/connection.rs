//! WebSocket connection state machine.
//!
//! A connection moves CONNECTING → OPEN → CLOSED. While OPEN its handle is
//! registered in the [`Directory`]; the write half drains the handle's
//! queue and the read half discards whatever the client sends.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{InboundFrame, encode_event};
use crate::domain::{ConnectionHandle, Directory, UserId};

/// Lifecycle of a single gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded, identity not yet bound.
    Connecting,
    /// Registered in the directory and receiving events.
    Open,
    /// Unregistered; the socket is gone.
    Closed,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Registers a fresh handle for `user_id`, superseding any older one.
/// - Forwards queued events to the client in order.
/// - Closes the socket once a newer connection for the same user
///   replaces this one, since the queue then has no senders left.
/// - Unregisters on exit, unless a newer connection already took over.
pub async fn run_connection(socket: WebSocket, user_id: UserId, directory: Arc<Directory>) {
    let mut state = ConnectionState::Connecting;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut event_rx) = ConnectionHandle::channel();
    let connection_id = handle.connection_id();

    directory.register(user_id, handle).await;
    transition(&mut state, ConnectionState::Open, user_id);

    loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match InboundFrame::parse(text.as_str()) {
                        InboundFrame::Json(_) => {
                            tracing::debug!(%user_id, %connection_id, "ignoring inbound frame");
                        }
                        InboundFrame::Malformed => {
                            tracing::debug!(%user_id, %connection_id, "ignoring malformed inbound frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%user_id, %connection_id, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Event queued by the notifier
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::debug!(%user_id, %connection_id, "connection superseded, closing");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                };
                let json = match encode_event(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(%user_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    tracing::debug!(%user_id, %connection_id, "ws write failed");
                    break;
                }
                tracing::trace!(%user_id, kind = ?event.kind(), "event delivered");
            }
        }
    }

    directory.unregister(user_id, connection_id).await;
    transition(&mut state, ConnectionState::Closed, user_id);
}

fn transition(state: &mut ConnectionState, next: ConnectionState, user_id: UserId) {
    tracing::debug!(%user_id, from = ?*state, to = ?next, "ws connection state");
    *state = next;
}
