//! Session handlers: create, send message, close, list.
//!
//! Every mutation here also pushes real-time events to connected
//! participants; see [`crate::service::SessionService`].

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CloseSessionRequest, CreateSessionRequest, MessageRequest, StatusResponse, UserQuery, required,
};
use crate::app_state::AppState;
use crate::domain::{MessageView, NewMessage, SessionView};
use crate::error::{ErrorResponse, MarketError};
use crate::persistence::CloseOutcome;
use crate::service::NewSession;

/// `POST /session/create`: Start a negotiation over an offer.
///
/// # Errors
///
/// Returns [`MarketError`] on missing fields or unresolved references.
#[utoipa::path(
    post,
    path = "/api/v1/session/create",
    tag = "Sessions",
    summary = "Create a session",
    description = "Creates a session with its initial message. Every participant except the owner receives a `sessionCreated` event, then every participant receives `messageSent` for the initial message.",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created, rendered for the owner", body = SessionView),
        (status = 400, description = "Missing or malformed field", body = ErrorResponse),
        (status = 404, description = "Owner, participant or offer not found", body = ErrorResponse),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let request = NewSession::try_from(req)?;
    let view = state.session_service.create_session(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `POST /session/sendMessage`: Post a message into a session.
///
/// # Errors
///
/// Returns [`MarketError`] on missing fields, over-long text or unresolved
/// references.
#[utoipa::path(
    post,
    path = "/api/v1/session/sendMessage",
    tag = "Sessions",
    summary = "Send a message",
    request_body = MessageRequest,
    responses(
        (status = 201, description = "Message stored and pushed to participants", body = MessageView),
        (status = 400, description = "Missing or malformed field", body = ErrorResponse),
        (status = 404, description = "Sender or session not found", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let message = NewMessage::try_from(req)?;
    let view = state.session_service.post_message(message).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `POST /session/close`: Close a session.
///
/// The id comes from the query string, or from a JSON body when the query
/// carries none. Closing twice succeeds and emits nothing the second time.
///
/// # Errors
///
/// Returns [`MarketError`] if no id is given or the session does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/session/close",
    tag = "Sessions",
    summary = "Close a session",
    params(CloseSessionRequest),
    request_body(
        content = CloseSessionRequest,
        content_type = "application/json",
        description = "Optional; read only when the query carries no `sessionId`",
    ),
    responses(
        (status = 200, description = "Session closed (or already closed)", body = StatusResponse),
        (status = 400, description = "Missing session id", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn close_session(
    State(state): State<AppState>,
    Query(query): Query<CloseSessionRequest>,
    body: Bytes,
) -> Result<impl IntoResponse, MarketError> {
    let from_body = if query.session_id.is_none() && !body.is_empty() {
        serde_json::from_slice::<CloseSessionRequest>(&body)
            .map_err(|e| MarketError::Validation(e.to_string()))?
    } else {
        CloseSessionRequest::default()
    };
    let session_id = required(query.session_id.or(from_body.session_id), "sessionId")?;
    let message = match state.session_service.close_session(session_id).await? {
        CloseOutcome::Closed(_) => "Session closed",
        CloseOutcome::AlreadyClosed(_) => "Session already closed",
    };
    Ok((StatusCode::OK, Json(StatusResponse::new(message))))
}

/// `GET /session/list`: Sessions a user takes part in.
///
/// # Errors
///
/// Returns [`MarketError`] if `userId` is missing or unknown.
#[utoipa::path(
    get,
    path = "/api/v1/session/list",
    tag = "Sessions",
    summary = "List sessions",
    description = "Returns every session the user owns or participates in, rendered for that user.",
    params(UserQuery),
    responses(
        (status = 200, description = "Sessions, oldest first", body = Vec<SessionView>),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = required(query.user_id, "userId")?;
    let sessions = state.session_service.list_sessions(user_id).await?;
    Ok((StatusCode::OK, Json(sessions)))
}

/// Session routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session/create", post(create_session))
        .route("/session/sendMessage", post(send_message))
        .route("/session/close", post(close_session))
        .route("/session/list", get(list_sessions))
}
