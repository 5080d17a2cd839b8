//! Currency handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::AddCurrenciesRequest;
use crate::app_state::AppState;
use crate::domain::CurrencyView;
use crate::error::{ErrorResponse, MarketError};

/// `GET /currency/getList`: All known currencies.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/v1/currency/getList",
    tag = "Currencies",
    summary = "List currencies",
    responses(
        (status = 200, description = "All currencies", body = Vec<CurrencyView>),
    )
)]
pub async fn list_currencies(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.market_service.list_currencies().await?))
}

/// `POST /currency/add`: Register a batch of currencies.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] if any entry is incomplete; nothing
/// is stored in that case.
#[utoipa::path(
    post,
    path = "/api/v1/currency/add",
    tag = "Currencies",
    summary = "Add currencies",
    request_body = AddCurrenciesRequest,
    responses(
        (status = 201, description = "Currencies created", body = Vec<CurrencyView>),
        (status = 400, description = "Incomplete entry", body = ErrorResponse),
    )
)]
pub async fn add_currencies(
    State(state): State<AppState>,
    Json(req): Json<AddCurrenciesRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let batch = req.into_batch()?;
    let created = state.market_service.add_currencies(batch).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Currency routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/currency/getList", get(list_currencies))
        .route("/currency/add", post(add_currencies))
}
