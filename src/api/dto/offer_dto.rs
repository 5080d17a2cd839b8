//! Offer DTOs: create and edit.

use serde::Deserialize;
use utoipa::ToSchema;

use super::common_dto::required;
use crate::domain::{CurrencyId, OfferDraft, OfferId, UserId};
use crate::error::MarketError;

/// Request body for `POST /offer/create` and `POST /offer/edit`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    /// Offer to replace. Required by `edit`, ignored by `create`.
    pub offer_id: Option<OfferId>,
    /// Posting user.
    pub creator_id: Option<UserId>,
    /// Currency given.
    pub from_currency_id: Option<CurrencyId>,
    /// Currency wanted.
    pub to_currency_id: Option<CurrencyId>,
    /// Amount given.
    pub from_amount: Option<f64>,
    /// Amount wanted.
    pub to_amount: Option<f64>,
    /// Quoted rate.
    pub exchange_rate: Option<f64>,
}

impl TryFrom<OfferRequest> for OfferDraft {
    type Error = MarketError;

    fn try_from(req: OfferRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            creator: required(req.creator_id, "creatorId")?,
            from_currency: required(req.from_currency_id, "fromCurrencyId")?,
            to_currency: required(req.to_currency_id, "toCurrencyId")?,
            from_amount: required(req.from_amount, "fromAmount")?,
            to_amount: required(req.to_amount, "toAmount")?,
            exchange_rate: required(req.exchange_rate, "exchangeRate")?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn converts_complete_request() {
        let Ok(req) = serde_json::from_value::<OfferRequest>(serde_json::json!({
            "creatorId": 1,
            "fromCurrencyId": 1,
            "toCurrencyId": 2,
            "fromAmount": 100.0,
            "toAmount": 9000.0,
            "exchangeRate": 90.0
        })) else {
            panic!("request should deserialize");
        };
        let Ok(draft) = OfferDraft::try_from(req) else {
            panic!("conversion should succeed");
        };
        assert_eq!(draft.creator, UserId::new(1));
        assert_eq!(draft.to_currency, CurrencyId::new(2));
    }

    #[test]
    fn missing_rate_names_field() {
        let req = OfferRequest {
            offer_id: None,
            creator_id: Some(UserId::new(1)),
            from_currency_id: Some(CurrencyId::new(1)),
            to_currency_id: Some(CurrencyId::new(2)),
            from_amount: Some(1.0),
            to_amount: Some(2.0),
            exchange_rate: None,
        };
        assert!(matches!(
            OfferDraft::try_from(req),
            Err(MarketError::Validation(ref m)) if m.contains("exchangeRate")
        ));
    }
}
