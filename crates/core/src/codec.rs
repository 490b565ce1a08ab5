//! Integer codecs used by the archive and the progress ledger
//!
//! Two encodings:
//! - Variable-length (LEB128-style) unsigned 64-bit integers, used for every
//!   integer inside an archive entry.
//! - Fixed-width 8-byte little-endian unsigned 64-bit integers, used only by
//!   the progress ledger where a header-counted format needs no framing.
//!
//! # Streaming
//!
//! [`get_var_u64`] is the scanning primitive for streaming readers. It
//! distinguishes "the buffer ends before the varint does"
//! ([`CodecError::InsufficientData`]) from real corruption, so a reader can
//! pull more bytes from its source and retry.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CodecError;

/// Maximum encoded length of a `u64` varint (ceil(64 / 7)).
pub const MAX_VARINT_LEN: usize = 10;

/// Width of a fixed-width integer in bytes.
pub const FIXED_LEN: usize = 8;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7f;

// =============================================================================
// Variable-length encoding
// =============================================================================

/// Append the varint encoding of `n` to `buf`.
///
/// Emits `byte(n) | 0x80` while `n >= 128`, shifting right by 7 bits each
/// time, then the remaining byte with the high bit clear. The output is
/// always the minimal number of bytes.
#[inline]
pub fn put_var_u64(buf: &mut Vec<u8>, mut n: u64) {
    while n >= u64::from(CONTINUATION) {
        buf.push((n as u8) | CONTINUATION);
        n >>= 7;
    }
    buf.push(n as u8);
}

/// Encode `n` as a standalone varint.
pub fn encode_var_u64(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(n));
    put_var_u64(&mut buf, n);
    buf
}

/// Decode a varint previously isolated by [`get_var_u64`].
///
/// ORs together 7-bit groups shifted by 0, 7, 14, ... and stops at the first
/// byte whose high bit is clear. Bytes after the terminator are ignored.
/// A slice without a terminator decodes the groups it has; callers are
/// expected to pass exactly the bytes produced by a prior scan.
pub fn decode_var_u64(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for (i, &b) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(b & PAYLOAD_MASK) << (7 * i as u32);
        if b & CONTINUATION == 0 {
            break;
        }
    }
    value
}

/// Scan one varint starting at `offset`.
///
/// Returns the varint's bytes and the offset just past its terminating byte.
///
/// # Errors
///
/// - [`CodecError::InsufficientData`] if `data` runs out before a byte with
///   the high bit clear is found. This is a "need more bytes" signal, not
///   corruption.
/// - [`CodecError::VarintTooLong`] if more than [`MAX_VARINT_LEN`] bytes
///   carry the continuation bit.
pub fn get_var_u64(data: &[u8], offset: usize) -> Result<(&[u8], usize), CodecError> {
    let mut end = offset;
    loop {
        let Some(&b) = data.get(end) else {
            return Err(CodecError::InsufficientData {
                offset,
                available: data.len().saturating_sub(offset),
            });
        };
        end += 1;
        if b & CONTINUATION == 0 {
            return Ok((&data[offset..end], end));
        }
        if end - offset >= MAX_VARINT_LEN {
            return Err(CodecError::VarintTooLong { offset });
        }
    }
}

/// Number of bytes [`encode_var_u64`] produces for `n`.
#[inline]
pub fn varint_len(n: u64) -> usize {
    let bits = 64 - n.leading_zeros() as usize;
    ((bits + 6) / 7).max(1)
}

// =============================================================================
// Fixed-width encoding
// =============================================================================

/// Encode `n` as 8 little-endian bytes.
#[inline]
pub fn encode_fixed_u64(n: u64) -> [u8; FIXED_LEN] {
    let mut out = [0u8; FIXED_LEN];
    LittleEndian::write_u64(&mut out, n);
    out
}

/// Decode 8 little-endian bytes.
#[inline]
pub fn decode_fixed_u64(bytes: [u8; FIXED_LEN]) -> u64 {
    LittleEndian::read_u64(&bytes)
}

/// Read the fixed-width integer stored at `offset`, if the slice holds one.
pub fn get_fixed_u64(data: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(FIXED_LEN)?;
    data.get(offset..end).map(LittleEndian::read_u64)
}
