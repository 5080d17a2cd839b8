//! User handlers: profile, rating and watchlist.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{RatingQuery, RenameQuery, StatusResponse, UserQuery, WatchlistQuery, required};
use crate::app_state::AppState;
use crate::domain::{OfferView, UserView};
use crate::error::{ErrorResponse, MarketError};

/// `POST /user/create`: Register a user with a default name.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    post,
    path = "/api/v1/user/create",
    tag = "Users",
    summary = "Create a user",
    responses(
        (status = 201, description = "User created", body = UserView),
    )
)]
pub async fn create_user(State(state): State<AppState>) -> Result<impl IntoResponse, MarketError> {
    let user = state.market_service.create_user().await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /user/info`: Public profile of a user.
///
/// # Errors
///
/// Returns [`MarketError`] if `userId` is missing or unknown.
#[utoipa::path(
    get,
    path = "/api/v1/user/info",
    tag = "Users",
    summary = "Get user info",
    params(UserQuery),
    responses(
        (status = 200, description = "User profile", body = UserView),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn user_info(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    Ok(Json(state.market_service.user_info(user_id).await?))
}

/// `POST /user/rename`: Change a display name.
///
/// # Errors
///
/// Returns [`MarketError`] on a missing or blank name, or an unknown user.
#[utoipa::path(
    post,
    path = "/api/v1/user/rename",
    tag = "Users",
    summary = "Rename a user",
    params(RenameQuery),
    responses(
        (status = 200, description = "Renamed user", body = UserView),
        (status = 400, description = "Missing or blank name", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn rename_user(
    State(state): State<AppState>,
    Query(query): Query<RenameQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    let new_name = required(query.new_name, "newName")?;
    Ok(Json(state.market_service.rename_user(user_id, &new_name).await?))
}

/// `POST /user/updateRating`: Submit a rating for a user.
///
/// # Errors
///
/// Returns [`MarketError`] on a missing or non-finite rating, or an unknown
/// user.
#[utoipa::path(
    post,
    path = "/api/v1/user/updateRating",
    tag = "Users",
    summary = "Rate a user",
    description = "Adds a rating submission. The profile shows the mean of all submissions.",
    params(RatingQuery),
    responses(
        (status = 200, description = "User with the updated average", body = UserView),
        (status = 400, description = "Missing or invalid rating", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn update_rating(
    State(state): State<AppState>,
    Query(query): Query<RatingQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    let rating = required(query.new_rating, "newRating")?;
    Ok(Json(state.market_service.update_rating(user_id, rating).await?))
}

/// `GET /user/watchlist`: Offers a user is watching.
///
/// # Errors
///
/// Returns [`MarketError`] if `userId` is missing or unknown.
#[utoipa::path(
    get,
    path = "/api/v1/user/watchlist",
    tag = "Users",
    summary = "List watched offers",
    params(UserQuery),
    responses(
        (status = 200, description = "Watched offers", body = Vec<OfferView>),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn watchlist(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    Ok(Json(state.market_service.watchlist(user_id).await?))
}

/// `POST /user/addWatchlist`: Watch an offer.
///
/// # Errors
///
/// Returns [`MarketError`] if the offer is already watched or an id does
/// not resolve.
#[utoipa::path(
    post,
    path = "/api/v1/user/addWatchlist",
    tag = "Users",
    summary = "Add to watchlist",
    params(WatchlistQuery),
    responses(
        (status = 200, description = "Offer added", body = StatusResponse),
        (status = 403, description = "Offer already on the watchlist", body = ErrorResponse),
        (status = 404, description = "User or offer not found", body = ErrorResponse),
    )
)]
pub async fn add_watchlist(
    State(state): State<AppState>,
    Query(query): Query<WatchlistQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    let offer_id = required(query.offer_id, "offerId")?;
    state.market_service.add_watchlist(user_id, offer_id).await?;
    Ok(Json(StatusResponse::new("Offer added to watchlist")))
}

/// `POST /user/removeWatchlist`: Stop watching an offer.
///
/// # Errors
///
/// Returns [`MarketError`] if the offer is not watched or the user is
/// unknown.
#[utoipa::path(
    post,
    path = "/api/v1/user/removeWatchlist",
    tag = "Users",
    summary = "Remove from watchlist",
    params(WatchlistQuery),
    responses(
        (status = 200, description = "Offer removed", body = StatusResponse),
        (status = 403, description = "Offer not on the watchlist", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn remove_watchlist(
    State(state): State<AppState>,
    Query(query): Query<WatchlistQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    let offer_id = required(query.offer_id, "offerId")?;
    state
        .market_service
        .remove_watchlist(user_id, offer_id)
        .await?;
    Ok(Json(StatusResponse::new("Offer removed from watchlist")))
}

/// `GET /user/getOffers`: Offers posted by a user.
///
/// # Errors
///
/// Returns [`MarketError`] if `userId` is missing or unknown.
#[utoipa::path(
    get,
    path = "/api/v1/user/getOffers",
    tag = "Users",
    summary = "List a user's offers",
    params(UserQuery),
    responses(
        (status = 200, description = "Offers created by the user", body = Vec<OfferView>),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn user_offers(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    Ok(Json(state.market_service.user_offers(user_id).await?))
}

/// User routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/info", get(user_info))
        .route("/user/rename", post(rename_user))
        .route("/user/updateRating", post(update_rating))
        .route("/user/watchlist", get(watchlist))
        .route("/user/addWatchlist", post(add_watchlist))
        .route("/user/removeWatchlist", post(remove_watchlist))
        .route("/user/getOffers", get(user_offers))
}
