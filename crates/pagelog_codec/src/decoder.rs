//! Canonical CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Decode a single value from CBOR bytes.
///
/// Trailing bytes after the first value are ignored; use
/// [`CanonicalDecoder`] to stream several concatenated values.
///
/// # Errors
///
/// Returns an error if the bytes are not valid canonical CBOR or contain
/// types outside the log record schema.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    decoder.decode()
}

/// Maximum allowed element count for arrays.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum allowed text length.
const MAX_TEXT_LENGTH: u64 = crate::encoder::MAX_TEXT_LENGTH;

/// A streaming canonical CBOR decoder.
///
/// Successive calls to [`decode`](Self::decode) walk a buffer of
/// concatenated values; [`is_empty`](Self::is_empty) reports when the
/// buffer is exhausted.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial_byte = self.read_byte()?;
        let major_type = initial_byte >> 5;
        let additional_info = initial_byte & 0x1f;

        match major_type {
            0 => self
                .decode_unsigned(additional_info)
                .map(|n| Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))),
            1 => self.decode_unsigned(additional_info).map(|n| {
                if i64::try_from(n).is_ok() {
                    Value::Integer(-(n as i64) - 1)
                } else {
                    Value::Integer(i64::MIN)
                }
            }),
            2 => Err(CodecError::unsupported_type("byte string")),
            3 => self.decode_text(additional_info),
            4 => self.decode_array(additional_info),
            5 => Err(CodecError::unsupported_type("map")),
            6 => Err(CodecError::unsupported_type("tag")),
            7 => self.decode_simple(additional_info),
            _ => Err(CodecError::invalid_structure("invalid major type")),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn decode_unsigned(&mut self, additional_info: u8) -> CodecResult<u64> {
        let (value, fits_shorter) = match additional_info {
            0..=23 => return Ok(u64::from(additional_info)),
            24 => {
                let byte = self.read_byte()?;
                (u64::from(byte), byte < 24)
            }
            25 => {
                let bytes = self.read_bytes(2)?;
                let value = u16::from_be_bytes([bytes[0], bytes[1]]);
                (u64::from(value), u8::try_from(value).is_ok())
            }
            26 => {
                let bytes = self.read_bytes(4)?;
                let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (u64::from(value), u16::try_from(value).is_ok())
            }
            27 => {
                let bytes = self.read_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                let value = u64::from_be_bytes(raw);
                (value, u32::try_from(value).is_ok())
            }
            28..=30 => return Err(CodecError::invalid_structure("reserved additional info")),
            _ => return Err(CodecError::IndefiniteLengthForbidden),
        };

        if fits_shorter {
            return Err(CodecError::invalid_structure(
                "non-canonical: value could be encoded in fewer bytes",
            ));
        }
        Ok(value)
    }

    fn decode_text(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_unsigned(additional_info)?;
        if len > MAX_TEXT_LENGTH {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: MAX_TEXT_LENGTH,
            });
        }
        let bytes = self.read_bytes(len as usize)?;
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(Value::Text(text.to_string()))
    }

    fn decode_array(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_unsigned(additional_info)?;
        if len > MAX_CONTAINER_ELEMENTS {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: MAX_CONTAINER_ELEMENTS,
            });
        }
        // Every element takes at least one byte; don't trust the header for the allocation.
        let len = len as usize;
        let mut items = Vec::with_capacity(len.min(self.data.len() - self.pos));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn decode_simple(&mut self, additional_info: u8) -> CodecResult<Value> {
        match additional_info {
            22 => Ok(Value::Null),
            20 | 21 => Err(CodecError::unsupported_type("bool")),
            23 => Err(CodecError::unsupported_type("undefined")),
            25..=27 => Err(CodecError::unsupported_type("float")),
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            31 => Err(CodecError::invalid_structure("break without indefinite")),
            _ => Err(CodecError::unsupported_type(format!(
                "simple value {additional_info}"
            ))),
        }
    }
}
