//! Archive entry: one synthesized row
//!
//! # Wire Format
//!
//! ```text
//! entry := varint(id) varint(len(uuid)) bytes(uuid) { varint(len(extra_i)) bytes(extra_i) }*
//! ```
//!
//! The number of extra fields is not stored. Readers must be told how many to
//! expect, and that count must equal the configured extra-column count of the
//! table the entries were inserted into.

use crate::codec::{decode_var_u64, get_var_u64, put_var_u64, varint_len};
use crate::error::CodecError;

/// One synthesized row as it was written to the database.
///
/// `id` matches the table's primary key; `uuid` is the primary payload
/// column; `extra_uuid[i]` is the value of extra column `i`, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Entry {
    /// Primary key value
    pub id: u64,
    /// Primary payload value
    pub uuid: String,
    /// One value per extra payload column, in column order
    pub extra_uuid: Vec<String>,
}

impl Entry {
    /// Create an entry.
    pub fn new(id: u64, uuid: impl Into<String>, extra_uuid: Vec<String>) -> Self {
        Self {
            id,
            uuid: uuid.into(),
            extra_uuid,
        }
    }

    /// Number of extra fields this entry carries.
    pub fn extra_count(&self) -> usize {
        self.extra_uuid.len()
    }

    /// Exact size of the encoded entry in bytes.
    pub fn encoded_len(&self) -> usize {
        let field = |s: &str| varint_len(s.len() as u64) + s.len();
        varint_len(self.id) + field(&self.uuid) + self.extra_uuid.iter().map(|s| field(s)).sum::<usize>()
    }

    /// Append the encoded entry to `buf`.
    ///
    /// Used to serialize a whole batch into one buffer before a single
    /// archive append.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        put_var_u64(buf, self.id);
        put_field(buf, &self.uuid);
        for extra in &self.extra_uuid {
            put_field(buf, extra);
        }
    }

    /// Encode the entry into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one entry from the start of `data`, expecting `extra_count`
    /// extra fields.
    ///
    /// Returns the entry and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// [`CodecError::InsufficientData`] if `data` ends inside the entry;
    /// any other variant means the bytes are corrupt.
    pub fn decode(data: &[u8], extra_count: usize) -> Result<(Entry, usize), CodecError> {
        let (id_bytes, mut offset) = get_var_u64(data, 0)?;
        let id = decode_var_u64(id_bytes);

        let (uuid, next) = get_field(data, offset)?;
        offset = next;

        let mut extra_uuid = Vec::with_capacity(extra_count);
        for _ in 0..extra_count {
            let (extra, next) = get_field(data, offset)?;
            extra_uuid.push(extra);
            offset = next;
        }

        Ok((Entry { id, uuid, extra_uuid }, offset))
    }
}

fn put_field(buf: &mut Vec<u8>, value: &str) {
    put_var_u64(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}

fn get_field(data: &[u8], offset: usize) -> Result<(String, usize), CodecError> {
    let (len_bytes, start) = get_var_u64(data, offset)?;
    let len = decode_var_u64(len_bytes);
    let len_usize = usize::try_from(len).map_err(|_| CodecError::LengthOverflow { offset, len })?;
    let end = start
        .checked_add(len_usize)
        .ok_or(CodecError::LengthOverflow { offset, len })?;

    let Some(payload) = data.get(start..end) else {
        return Err(CodecError::InsufficientData {
            offset: start,
            available: data.len().saturating_sub(start),
        });
    };
    let value = std::str::from_utf8(payload)
        .map_err(|_| CodecError::InvalidUtf8 { offset: start })?
        .to_owned();
    Ok((value, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(id: u64, extra: usize) -> Entry {
        Entry::new(
            id,
            uuid::Uuid::new_v4().to_string(),
            (0..extra).map(|_| uuid::Uuid::new_v4().to_string()).collect(),
        )
    }

    #[test]
    fn test_encode_layout() {
        let entry = Entry::new(300, "ab", vec!["xyz".to_string()]);
        assert_eq!(
            entry.encode(),
            vec![0xac, 0x02, 0x02, b'a', b'b', 0x03, b'x', b'y', b'z']
        );
        assert_eq!(entry.encoded_len(), 9);
    }

    #[test]
    fn test_decode_reports_consumed_bytes() {
        let first = sample(1, 2);
        let second = sample(2, 2);
        let mut buf = Vec::new();
        first.encode_into(&mut buf);
        second.encode_into(&mut buf);

        let (decoded, used) = Entry::decode(&buf, 2).unwrap();
        assert_eq!(decoded, first);
        assert_eq!(used, first.encoded_len());

        let (decoded, rest) = Entry::decode(&buf[used..], 2).unwrap();
        assert_eq!(decoded, second);
        assert_eq!(used + rest, buf.len());
    }

    #[test]
    fn test_decode_truncated_needs_more() {
        let bytes = sample(42, 3).encode();
        for cut in 0..bytes.len() {
            let err = Entry::decode(&bytes[..cut], 3).unwrap_err();
            assert!(err.is_insufficient(), "cut at {} gave {:?}", cut, err);
        }
    }

    #[test]
    fn test_extra_count_is_external_contract() {
        // Decoding with fewer extras than written leaves bytes unread;
        // decoding with more runs out of data.
        let entry = sample(9, 2);
        let bytes = entry.encode();

        let (short, used) = Entry::decode(&bytes, 1).unwrap();
        assert_eq!(short.extra_uuid.len(), 1);
        assert!(used < bytes.len());

        assert!(Entry::decode(&bytes, 3).unwrap_err().is_insufficient());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let bytes = vec![0x01, 0x02, 0xff, 0xfe];
        assert_eq!(
            Entry::decode(&bytes, 0).unwrap_err(),
            CodecError::InvalidUtf8 { offset: 2 }
        );
    }

    #[test]
    fn test_empty_strings_roundtrip() {
        let entry = Entry::new(0, "", vec![String::new(), String::new()]);
        let bytes = entry.encode();
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x00]);
        assert_eq!(Entry::decode(&bytes, 2).unwrap().0, entry);
    }

    proptest! {
        #[test]
        fn prop_entry_roundtrip(
            id in any::<u64>(),
            uuid in ".{0,40}",
            extra in proptest::collection::vec(".{0,40}", 0..6),
        ) {
            let entry = Entry::new(id, uuid, extra);
            let bytes = entry.encode();
            prop_assert_eq!(bytes.len(), entry.encoded_len());
            let (decoded, used) = Entry::decode(&bytes, entry.extra_count()).unwrap();
            prop_assert_eq!(used, bytes.len());
            prop_assert_eq!(decoded, entry);
        }
    }
}
