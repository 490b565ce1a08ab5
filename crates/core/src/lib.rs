//! Core types for rowcheck
//!
//! This crate defines:
//! - `codec`: varint and fixed-width integer encodings
//! - `entry`: the archived row record and its framing
//! - `error`: codec errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entry;
pub mod error;

pub use codec::{
    decode_fixed_u64, decode_var_u64, encode_fixed_u64, encode_var_u64, get_fixed_u64,
    get_var_u64, put_var_u64, varint_len, FIXED_LEN, MAX_VARINT_LEN,
};
pub use entry::Entry;
pub use error::CodecError;
