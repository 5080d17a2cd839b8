//! # obmen-gateway
//!
//! REST API and real-time WebSocket gateway for a currency-exchange
//! marketplace.
//!
//! Users post exchange offers, keep watchlists and negotiate in per-offer
//! chat sessions. Session mutations are persisted first and then fanned
//! out, rendered per recipient, to every participant that currently holds
//! a live WebSocket connection.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Gateway (ws/) ───────────┐ register / unregister
//!     │                               │
//!     ├── SessionService (service/)   │
//!     │       ├── Renderer            │
//!     │       └── Notifier ──────► Directory (domain/)
//!     ├── MarketService (service/)
//!     │
//!     └── Store (persistence/): MemoryStore | PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Assembles the full HTTP application: REST routes, the WebSocket
/// endpoint and the tower-http layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws/{user_id}", get(ws::handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
