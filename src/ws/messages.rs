//! WebSocket frame encoding.
//!
//! Outbound frames are [`ServerEvent`]s as JSON text. Clients have nothing
//! to say on this channel yet, so inbound frames are only classified for
//! logging.

use crate::domain::ServerEvent;

/// Serializes an event to the text frame sent to the client.
///
/// # Errors
///
/// Returns the serializer error; views hold only plain data, so this is
/// not expected in practice.
pub fn encode_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Classification of a text frame received from a client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Well-formed JSON; the content is not acted upon.
    Json(serde_json::Value),
    /// Anything else. Not an error.
    Malformed,
}

impl InboundFrame {
    /// Classifies raw frame text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).map_or(Self::Malformed, Self::Json)
    }
}
