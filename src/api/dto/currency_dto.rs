//! Currency DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

use super::common_dto::required;
use crate::domain::NewCurrency;
use crate::error::MarketError;

/// One currency in an `add` batch.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRequest {
    /// Display name, e.g. `dollar`.
    pub name: Option<String>,
    /// Capitalised code, e.g. `USD`.
    pub capital_name: Option<String>,
    /// Display symbol.
    pub unicode_symbol: Option<String>,
    /// Display colour as `#rrggbb`.
    pub color_hex: Option<String>,
}

/// Request body for `POST /currency/add`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddCurrenciesRequest {
    /// Currencies to register.
    pub data: Option<Vec<CurrencyRequest>>,
}

impl TryFrom<CurrencyRequest> for NewCurrency {
    type Error = MarketError;

    fn try_from(req: CurrencyRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: required(req.name, "name")?,
            capital_name: required(req.capital_name, "capitalName")?,
            unicode_symbol: required(req.unicode_symbol, "unicodeSymbol")?,
            color_hex: required(req.color_hex, "colorHex")?,
        })
    }
}

impl AddCurrenciesRequest {
    /// Converts every entry, failing on the first incomplete one.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if `data` or any entry field is
    /// missing.
    pub fn into_batch(self) -> Result<Vec<NewCurrency>, MarketError> {
        required(self.data, "data")?
            .into_iter()
            .map(NewCurrency::try_from)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_name_and_code_land_in_their_fields() {
        let Ok(req) = serde_json::from_value::<AddCurrenciesRequest>(serde_json::json!({
            "data": [{"name": "dollar", "capitalName": "USD", "unicodeSymbol": "$", "colorHex": "#00ff00"}]
        })) else {
            panic!("request should deserialize");
        };
        let Ok(batch) = req.into_batch() else {
            panic!("complete entry should convert");
        };
        let Some(currency) = batch.first() else {
            panic!("one currency expected");
        };
        assert_eq!(currency.name, "dollar");
        assert_eq!(currency.capital_name, "USD");
    }

    #[test]
    fn one_bad_entry_rejects_the_batch() {
        let req = AddCurrenciesRequest {
            data: Some(vec![
                CurrencyRequest {
                    name: Some("dollar".to_string()),
                    capital_name: Some("USD".to_string()),
                    unicode_symbol: Some("$".to_string()),
                    color_hex: Some("#00ff00".to_string()),
                },
                CurrencyRequest {
                    name: Some("ruble".to_string()),
                    capital_name: None,
                    unicode_symbol: Some("₽".to_string()),
                    color_hex: Some("#ff0000".to_string()),
                },
            ]),
        };
        let result = req.into_batch();
        assert!(matches!(result, Err(MarketError::Validation(ref m)) if m.contains("capitalName")));
    }

    #[test]
    fn missing_data_is_rejected() {
        assert!(AddCurrenciesRequest { data: None }.into_batch().is_err());
    }
}
