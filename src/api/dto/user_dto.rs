//! User DTOs. These endpoints take their arguments from the query string.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{OfferId, UserId};

/// `?userId=&newName=` parameters for `POST /user/rename`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RenameQuery {
    /// User to rename.
    pub user_id: Option<UserId>,
    /// Replacement display name.
    pub new_name: Option<String>,
}

/// `?userId=&newRating=` parameters for `POST /user/updateRating`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RatingQuery {
    /// User being rated.
    pub user_id: Option<UserId>,
    /// Rating to fold into the average.
    pub new_rating: Option<f64>,
}

/// `?userId=&offerId=` parameters for the watchlist endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WatchlistQuery {
    /// Watchlist owner.
    pub user_id: Option<UserId>,
    /// Offer to add or remove.
    pub offer_id: Option<OfferId>,
}
