//! Service layer: business logic orchestration.
//!
//! [`SessionService`] owns negotiation sessions and their real-time
//! fan-out through the [`crate::domain::Notifier`]. [`MarketService`]
//! covers the plain record operations on users, currencies and offers.

pub mod market_service;
pub mod render;
pub mod session_service;

pub use market_service::MarketService;
pub use render::Renderer;
pub use session_service::{InitialMessage, NewSession, SessionService};
