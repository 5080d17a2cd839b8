//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{Directory, Notifier};
use crate::persistence::Store;
use crate::service::{MarketService, SessionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Negotiation sessions and real-time fan-out.
    pub session_service: Arc<SessionService>,
    /// User, currency and offer records.
    pub market_service: Arc<MarketService>,
    /// Live connections, registered by the WebSocket gateway.
    pub directory: Arc<Directory>,
    /// Persistence collaborator, used by the gateway to resolve identities.
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Wires services, notifier and directory around `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, message_max_len: usize) -> Self {
        let directory = Arc::new(Directory::new());
        let notifier = Notifier::new(Arc::clone(&directory));
        let session_service = Arc::new(SessionService::new(
            Arc::clone(&store),
            notifier,
            message_max_len,
        ));
        let market_service = Arc::new(MarketService::new(Arc::clone(&store)));
        Self {
            session_service,
            market_service,
            directory,
            store,
        }
    }
}
