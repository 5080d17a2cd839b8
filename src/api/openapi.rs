//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers::{currency, offer, session, system, user};

/// Generated OpenAPI description, served at [`ApiDoc::JSON_PATH`] when the
/// `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "obmen-gateway",
        description = "Currency-exchange marketplace: offers, negotiation sessions and real-time notifications"
    ),
    paths(
        session::create_session,
        session::send_message,
        session::close_session,
        session::list_sessions,
        user::create_user,
        user::user_info,
        user::rename_user,
        user::update_rating,
        user::watchlist,
        user::add_watchlist,
        user::remove_watchlist,
        user::user_offers,
        currency::list_currencies,
        currency::add_currencies,
        offer::create_offer,
        offer::edit_offer,
        offer::list_offers,
        system::health_handler,
    ),
    tags(
        (name = "Sessions", description = "Negotiation sessions and messages"),
        (name = "Users", description = "Profiles, ratings and watchlists"),
        (name = "Currencies", description = "Currency catalogue"),
        (name = "Offers", description = "Exchange offers"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Route serving the JSON document.
    pub const JSON_PATH: &'static str = "/api-docs/openapi.json";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_session_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/session/create"));
        assert!(doc.paths.paths.contains_key("/api/v1/session/close"));
        assert!(doc.paths.paths.contains_key("/health"));
    }

    #[test]
    fn close_documents_optional_json_body() {
        let doc = ApiDoc::openapi();
        let body = doc
            .paths
            .paths
            .get("/api/v1/session/close")
            .and_then(|item| item.post.as_ref())
            .and_then(|op| op.request_body.as_ref());
        assert!(body.is_some_and(|b| b.content.contains_key("application/json")));
    }
}
