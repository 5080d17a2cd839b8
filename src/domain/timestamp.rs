//! Wire timestamp format.
//!
//! All timestamps cross the API boundary as `YYYY-MM-DD HH:MM:SS` without
//! an offset. They are interpreted as UTC on the way in and rendered in
//! UTC on the way out, so every comparison inside the crate happens on
//! `DateTime<Utc>` values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::MarketError;

/// `strftime` pattern used for every timestamp on the wire.
pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a wire timestamp, treating it as UTC.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] if the string does not match
/// [`WIRE_FORMAT`].
pub fn parse(raw: &str) -> Result<DateTime<Utc>, MarketError> {
    NaiveDateTime::parse_from_str(raw.trim(), WIRE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            MarketError::Validation(format!(
                "invalid timestamp {raw:?}: expected YYYY-MM-DD HH:MM:SS"
            ))
        })
}

/// Renders a timestamp in the wire format.
#[must_use]
pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Initial `last_message_date` of a session that has no messages yet
/// (`1000-12-31 23:59:00`).
#[must_use]
pub fn far_past() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1000, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |naive| naive.and_utc())
}

/// Serde adapter for `DateTime<Utc>` fields in the wire format.
pub mod wire {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a timestamp as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(ts))
    }

    /// Deserializes a `YYYY-MM-DD HH:MM:SS` string as UTC.
    ///
    /// # Errors
    ///
    /// Fails if the string is not in the wire format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}
