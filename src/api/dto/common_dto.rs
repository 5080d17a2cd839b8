//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::UserId;
use crate::error::MarketError;

/// Unwraps a required request field.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] naming `field` when it is absent.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, MarketError> {
    value.ok_or_else(|| MarketError::Validation(format!("missing field `{field}`")))
}

/// `?userId=` query parameter.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Target (or viewing) user.
    pub user_id: Option<UserId>,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl StatusResponse {
    /// Builds an acknowledgement with the given text.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
