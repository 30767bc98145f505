//! The external encoded form of stream events.
//!
//! Events encode to JSON objects shaped as:
//!
//! ```text
//! {
//!   "id": "<tail id>",
//!   "span": {"id": u32, "parent": u32},
//!   "timestamp_ms_since_epoch": u64,
//!   "sequence": u32,
//!   "event": { "<kind>": ... }
//! }
//! ```
//!
//! where `<kind>` is one of `onset`, `outcome`, `dropped`, `span_close`,
//! `event_info`, `log`, `exception`, `diagnostic_channel`, `mark`,
//! `metrics`, `subrequest`, `subrequest_outcome`, `custom`. Encoding then
//! decoding reproduces the event with full fidelity.

use crate::event::StreamEvent;

/// Errors from encoding or decoding the external form.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The event could not be encoded.
    #[error("failed to encode stream event: {0}")]
    Encode(#[source] serde_json::Error),

    /// The input could not be decoded as a stream event.
    #[error("failed to decode stream event: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes a stream event to its external JSON form.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if serialization fails.
pub fn encode(event: &StreamEvent) -> Result<String, WireError> {
    serde_json::to_string(event).map_err(WireError::Encode)
}

/// Decodes a stream event from its external JSON form.
///
/// # Errors
///
/// Returns [`WireError::Decode`] if the input does not match the documented
/// shape.
pub fn decode(input: &str) -> Result<StreamEvent, WireError> {
    serde_json::from_str(input).map_err(WireError::Decode)
}
