//! Offer handlers: create, edit, list.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{OfferRequest, UserQuery, required};
use crate::app_state::AppState;
use crate::domain::{OfferDraft, OfferView};
use crate::error::{ErrorResponse, MarketError};

/// `POST /offer/create`: Post an offer.
///
/// # Errors
///
/// Returns [`MarketError`] on missing fields or unresolved references.
#[utoipa::path(
    post,
    path = "/api/v1/offer/create",
    tag = "Offers",
    summary = "Create an offer",
    request_body = OfferRequest,
    responses(
        (status = 201, description = "Offer created, rendered for its creator", body = OfferView),
        (status = 400, description = "Missing field", body = ErrorResponse),
        (status = 404, description = "Creator or currency not found", body = ErrorResponse),
    )
)]
pub async fn create_offer(
    State(state): State<AppState>,
    Json(req): Json<OfferRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let draft = OfferDraft::try_from(req)?;
    let offer = state.market_service.create_offer(draft).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// `POST /offer/edit`: Replace an offer's fields.
///
/// # Errors
///
/// Returns [`MarketError`] on missing fields or unresolved references.
#[utoipa::path(
    post,
    path = "/api/v1/offer/edit",
    tag = "Offers",
    summary = "Edit an offer",
    request_body = OfferRequest,
    responses(
        (status = 200, description = "Updated offer", body = OfferView),
        (status = 400, description = "Missing field", body = ErrorResponse),
        (status = 404, description = "Offer, creator or currency not found", body = ErrorResponse),
    )
)]
pub async fn edit_offer(
    State(state): State<AppState>,
    Json(req): Json<OfferRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let offer_id = required(req.offer_id, "offerId")?;
    let draft = OfferDraft::try_from(req)?;
    Ok(Json(state.market_service.edit_offer(offer_id, draft).await?))
}

/// `GET /offer/getList`: All offers, as seen by a user.
///
/// # Errors
///
/// Returns [`MarketError`] if `userId` is missing or unknown.
#[utoipa::path(
    get,
    path = "/api/v1/offer/getList",
    tag = "Offers",
    summary = "List offers",
    description = "Returns every offer with `isOnWatchlist` computed for the viewing user.",
    params(UserQuery),
    responses(
        (status = 200, description = "All offers", body = Vec<OfferView>),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let viewer_id = required(query.user_id, "userId")?;
    Ok(Json(state.market_service.list_offers(viewer_id).await?))
}

/// Offer routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offer/create", post(create_offer))
        .route("/offer/edit", post(edit_offer))
        .route("/offer/getList", get(list_offers))
}
