//! Binary codec for staged operations.
//!
//! Operations encode to named `MsgPack` via `rmp_serde::to_vec_named()`, so
//! field names travel with the payload and a decoder built from the same
//! model reproduces the operation exactly.

use crate::operation::StagedOperation;

/// Errors from encoding or decoding a staged operation.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode operation: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode operation: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encodes a staged operation to bytes.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode(op: &StagedOperation) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(op)?)
}

/// Decodes bytes produced by [`encode`].
///
/// # Errors
///
/// Returns `CodecError::Decode` for truncated or foreign payloads.
pub fn decode(bytes: &[u8]) -> Result<StagedOperation, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
