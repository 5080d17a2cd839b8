//! WebSocket layer: connection gateway for real-time notifications.
//!
//! The endpoint at `/ws/{user_id}` binds one socket to one user, registers
//! it in the [`Directory`](crate::domain::Directory) and streams
//! [`ServerEvent`](crate::domain::ServerEvent)s to the client until either
//! side hangs up.

pub mod connection;
pub mod handler;
pub mod messages;
