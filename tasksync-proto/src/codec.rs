//! JSON encoding and decoding for the tasksync wire format.
//!
//! The remote store exposes its task collection as a JSON object keyed by
//! server-chosen strings. [`decode_collection`] returns that keyed mapping;
//! callers discard the keys and work with the values. A `null` document is
//! the remote's way of saying the collection is empty and decodes as such.

use std::collections::BTreeMap;

use crate::task::TaskRepresentation;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload is not valid JSON or does not have the expected shape.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// The value could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decodes a keyed collection of task representations.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the payload is not JSON, is not an
/// object (or `null`), or any entry is missing a required field.
pub fn decode_collection(bytes: &[u8]) -> Result<BTreeMap<String, TaskRepresentation>, CodecError> {
    let collection: Option<BTreeMap<String, TaskRepresentation>> =
        serde_json::from_slice(bytes).map_err(CodecError::Decode)?;
    Ok(collection.unwrap_or_default())
}

/// Decodes a single task representation.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the payload is not a valid representation.
pub fn decode(bytes: &[u8]) -> Result<TaskRepresentation, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

/// Encodes a single task representation as a JSON object.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode(rep: &TaskRepresentation) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(rep).map_err(CodecError::Encode)
}
