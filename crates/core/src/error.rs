//! Error types for persisted-data validation.

use thiserror::Error;

/// Failures while decoding persisted blending records.
///
/// Decode errors are never fatal to chunk generation: callers fall back to
/// "no legacy blend data" for the affected chunk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A stored height array does not match the halo-inclusive column
    /// count. Rejected outright rather than truncated or padded.
    #[error("blend height array length mismatch: expected {expected}, got {actual}")]
    HeightArrayLength {
        /// Required array length.
        expected: usize,
        /// Length found in the stored record.
        actual: usize,
    },

    /// The record payload could not be deserialized at all.
    #[error("corrupt blend record: {0}")]
    Corrupt(String),
}
