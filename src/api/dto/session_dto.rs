//! Session DTOs: create, send message, close, list.
//!
//! Request fields are optional at the serde level so that a missing
//! field surfaces as a validation error naming the field.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::common_dto::required;
use crate::domain::{NewMessage, OfferId, SessionId, UserId, timestamp};
use crate::error::MarketError;
use crate::service::{InitialMessage, NewSession};

/// Message body as sent by clients.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    /// Author.
    pub sender_id: Option<UserId>,
    /// Target session. Filled in by the server for initial messages.
    pub session_id: Option<SessionId>,
    /// Timestamp, `YYYY-MM-DD HH:MM:SS`, interpreted as UTC.
    #[schema(example = "2024-01-01 10:00:00")]
    pub message_date: Option<String>,
    /// Message body.
    pub message_text: Option<String>,
}

/// Request body for `POST /session/create`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// User starting the negotiation.
    pub owner_id: Option<UserId>,
    /// Participants, owner included by convention.
    pub user_ids: Option<Vec<UserId>>,
    /// Offer under negotiation.
    pub offer_id: Option<OfferId>,
    /// First message of the session.
    pub initial_message: Option<MessageRequest>,
}

/// `?sessionId=` parameter (query or body) for `POST /session/close`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CloseSessionRequest {
    /// Session to close.
    pub session_id: Option<SessionId>,
}

impl TryFrom<MessageRequest> for NewMessage {
    type Error = MarketError;

    fn try_from(req: MessageRequest) -> Result<Self, Self::Error> {
        let sender_id = required(req.sender_id, "senderId")?;
        let session_id = required(req.session_id, "sessionId")?;
        let message_date = timestamp::parse(&required(req.message_date, "messageDate")?)?;
        let text = required(req.message_text, "messageText")?;
        Ok(Self {
            sender_id,
            session_id,
            message_date,
            text,
        })
    }
}

impl TryFrom<MessageRequest> for InitialMessage {
    type Error = MarketError;

    fn try_from(req: MessageRequest) -> Result<Self, Self::Error> {
        let sender_id = required(req.sender_id, "initialMessage.senderId")?;
        let message_date =
            timestamp::parse(&required(req.message_date, "initialMessage.messageDate")?)?;
        let text = required(req.message_text, "initialMessage.messageText")?;
        Ok(Self {
            sender_id,
            message_date,
            text,
        })
    }
}

impl TryFrom<CreateSessionRequest> for NewSession {
    type Error = MarketError;

    fn try_from(req: CreateSessionRequest) -> Result<Self, Self::Error> {
        let owner_id = required(req.owner_id, "ownerId")?;
        let participant_ids = required(req.user_ids, "userIds")?;
        let offer_id = required(req.offer_id, "offerId")?;
        let initial_message = required(req.initial_message, "initialMessage")?.try_into()?;
        Ok(Self {
            owner_id,
            participant_ids,
            offer_id,
            initial_message,
        })
    }
}
