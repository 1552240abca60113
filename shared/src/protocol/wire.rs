//! Binary encoding of the identity and field-list messages.
//!
//! All integers are little-endian regardless of host byte order. Strings are
//! a `u32` byte length followed by raw UTF-8. Birth dates travel as whole
//! seconds since the Unix epoch (UTC) in a `u32`, so the representable range
//! is 1970-01-01T00:00:00Z through 2106-02-07T06:28:15Z.
//!
//! ```text
//! Identity  := u64 user_id | u32 len | username | u32 birth_ts | u8 gender
//! FieldList := u32 count | (u32 len | field) * count
//! ```
//!
//! Decoding never reads past the declared lengths and tolerates trailing
//! bytes; use the `decode_prefix` variants to learn how much was consumed.

use crate::types::fields::FieldList;
use crate::types::identity::{Gender, Identity, UserId};
use bytes::{Buf, BufMut};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Upper bound on the number of entries in a field list. Guards decode-time
/// allocation against hostile counts.
pub const MAX_FIELD_COUNT: usize = 65_536;

const U8_LEN: usize = 1;
const U32_LEN: usize = 4;
const U64_LEN: usize = 8;

/// Errors produced while encoding or decoding a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Fewer bytes remain than the layout (or a length prefix) requires
    #[error("truncated input reading {field}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Text that is not UTF-8, or a value with no calendar/character meaning
    #[error("invalid encoding in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    /// A length or timestamp does not fit its 32-bit wire slot
    #[error("{field} does not fit in 32 bits: {value}")]
    EncodingOverflow { field: &'static str, value: i128 },

    #[error("field count {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
}

pub type WireResult<T> = Result<T, WireError>;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn put_len(buf: &mut Vec<u8>, field: &'static str, len: usize) -> WireResult<()> {
    let len = u32::try_from(len).map_err(|_| WireError::EncodingOverflow {
        field,
        value: len as i128,
    })?;
    buf.put_u32_le(len);
    Ok(())
}

fn put_str(buf: &mut Vec<u8>, field: &'static str, s: &str) -> WireResult<()> {
    put_len(buf, field, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn timestamp_secs(date: &DateTime<Utc>) -> WireResult<u32> {
    let secs = date.timestamp();
    u32::try_from(secs).map_err(|_| WireError::EncodingOverflow {
        field: "birth_date",
        value: secs as i128,
    })
}

/// Encode an identity message from its parts.
///
/// Any sub-second part of `birth_date` is dropped.
pub fn encode_identity(
    user_id: UserId,
    username: &str,
    birth_date: DateTime<Utc>,
    gender: Gender,
) -> WireResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(U64_LEN + U32_LEN + username.len() + U32_LEN + U8_LEN);
    buf.put_u64_le(user_id);
    put_str(&mut buf, "username", username)?;
    buf.put_u32_le(timestamp_secs(&birth_date)?);
    buf.put_u8(gender.as_byte());
    Ok(buf)
}

/// Encode a field-list message. Order is preserved.
pub fn encode_field_list<S: AsRef<str>>(fields: &[S]) -> WireResult<Vec<u8>> {
    if fields.len() > MAX_FIELD_COUNT {
        return Err(WireError::TooManyFields {
            count: fields.len(),
            max: MAX_FIELD_COUNT,
        });
    }
    let payload: usize = fields.iter().map(|f| U32_LEN + f.as_ref().len()).sum();
    let mut buf = Vec::with_capacity(U32_LEN + payload);
    put_len(&mut buf, "field_count", fields.len())?;
    for field in fields {
        put_str(&mut buf, "field", field.as_ref())?;
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over an input buffer
struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    fn consumed(&self) -> usize {
        self.total - self.buf.len()
    }

    fn ensure(&self, field: &'static str, needed: usize) -> WireResult<()> {
        if self.buf.len() < needed {
            return Err(WireError::TruncatedInput {
                field,
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    fn u8(&mut self, field: &'static str) -> WireResult<u8> {
        self.ensure(field, U8_LEN)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self, field: &'static str) -> WireResult<u32> {
        self.ensure(field, U32_LEN)?;
        Ok(self.buf.get_u32_le())
    }

    fn u64(&mut self, field: &'static str) -> WireResult<u64> {
        self.ensure(field, U64_LEN)?;
        Ok(self.buf.get_u64_le())
    }

    fn bytes(&mut self, field: &'static str, len: usize) -> WireResult<&'a [u8]> {
        self.ensure(field, len)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, field: &'static str) -> WireResult<String> {
        let len = self.u32(field)? as usize;
        let raw = self.bytes(field, len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| WireError::InvalidEncoding {
                field,
                reason: e.to_string(),
            })
    }
}

fn read_identity(r: &mut WireReader<'_>) -> WireResult<Identity> {
    let user_id = r.u64("user_id")?;
    let username = r.string("username")?;
    let secs = r.u32("birth_date")?;
    let birth_date = Utc
        .timestamp_opt(i64::from(secs), 0)
        .single()
        .ok_or_else(|| WireError::InvalidEncoding {
            field: "birth_date",
            reason: format!("timestamp {secs} is out of range"),
        })?;
    let raw = r.u8("gender")?;
    let gender = Gender::from_byte(raw).ok_or_else(|| WireError::InvalidEncoding {
        field: "gender",
        reason: format!("byte 0x{raw:02x} is not a single-byte UTF-8 character"),
    })?;
    Ok(Identity::new(user_id, username, birth_date, gender))
}

fn read_field_list(r: &mut WireReader<'_>) -> WireResult<FieldList> {
    let count = r.u32("field_count")? as usize;
    if count > MAX_FIELD_COUNT {
        return Err(WireError::TooManyFields {
            count,
            max: MAX_FIELD_COUNT,
        });
    }
    // Every entry carries at least its length prefix.
    r.ensure("field", count * U32_LEN)?;
    let fields = (0..count)
        .map(|_| r.string("field"))
        .collect::<WireResult<Vec<_>>>()?;
    Ok(FieldList::from(fields))
}

/// Decode an identity message from the start of `bytes`.
pub fn decode_identity(bytes: &[u8]) -> WireResult<Identity> {
    Identity::from_bytes(bytes)
}

/// Decode a field-list message from the start of `bytes`.
pub fn decode_field_list(bytes: &[u8]) -> WireResult<FieldList> {
    FieldList::from_bytes(bytes)
}

impl Identity {
    /// Serialize to the wire layout.
    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        encode_identity(
            self.user_id(),
            self.username(),
            self.birth_date(),
            self.gender(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        Self::decode_prefix(bytes).map(|(identity, _)| identity)
    }

    /// Decode from the start of `bytes`, returning the message and the number
    /// of bytes it occupied.
    pub fn decode_prefix(bytes: &[u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(bytes);
        let identity = read_identity(&mut reader)?;
        Ok((identity, reader.consumed()))
    }
}

impl FieldList {
    /// Serialize to the wire layout.
    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        encode_field_list(self.as_slice())
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        Self::decode_prefix(bytes).map(|(fields, _)| fields)
    }

    /// Decode from the start of `bytes`, returning the message and the number
    /// of bytes it occupied.
    pub fn decode_prefix(bytes: &[u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(bytes);
        let fields = read_field_list(&mut reader)?;
        Ok((fields, reader.consumed()))
    }
}
