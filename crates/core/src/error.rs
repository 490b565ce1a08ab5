//! Error types for the codec and entry framing

use thiserror::Error;

/// Errors produced while scanning or decoding encoded integers and entries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ends before the current field does.
    ///
    /// Streaming readers treat this as "pull more bytes and retry".
    #[error("data not enough: {available} bytes available from offset {offset}")]
    InsufficientData {
        /// Offset where the field starts
        offset: usize,
        /// Bytes available from `offset` to the end of the buffer
        available: usize,
    },

    /// A varint carries the continuation bit past the maximum `u64` width.
    #[error("varint at offset {offset} is longer than 10 bytes")]
    VarintTooLong {
        /// Offset where the varint starts
        offset: usize,
    },

    /// A length-prefixed field does not hold valid UTF-8.
    #[error("field at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset where the field's payload starts
        offset: usize,
    },

    /// A length prefix does not fit in memory on this platform.
    #[error("field length {len} at offset {offset} is too large")]
    LengthOverflow {
        /// Offset of the length prefix
        offset: usize,
        /// Decoded length
        len: u64,
    },
}

impl CodecError {
    /// True for the "need more bytes" condition.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, CodecError::InsufficientData { .. })
    }
}
