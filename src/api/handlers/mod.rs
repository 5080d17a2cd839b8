//! REST endpoint handlers organized by resource.

pub mod currency;
pub mod offer;
pub mod session;
pub mod system;
pub mod user;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(session::routes())
        .merge(user::routes())
        .merge(currency::routes())
        .merge(offer::routes())
}
