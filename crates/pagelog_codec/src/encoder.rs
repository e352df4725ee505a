//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Maximum length of a single text field.
///
/// Matches the decoder limit so that everything we write can be read back.
pub const MAX_TEXT_LENGTH: u64 = 256 * 1024 * 1024;

/// Encode a value to canonical CBOR bytes.
///
/// # Errors
///
/// Returns an error if a text field exceeds [`MAX_TEXT_LENGTH`].
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder.
///
/// The encoder appends to an internal buffer and never reallocates it
/// behind the caller's back, so it doubles as the byte sink of a log page:
/// [`len`](Self::len) is the number of encoded bytes and
/// [`clear`](Self::clear) resets it while keeping the allocation.
#[derive(Debug, Clone)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
    max_text_len: u64,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            max_text_len: MAX_TEXT_LENGTH,
        }
    }

    /// Lower the maximum accepted text length.
    ///
    /// Values above [`MAX_TEXT_LENGTH`] are clamped.
    #[must_use]
    pub fn with_text_limit(mut self, limit: u64) -> Self {
        self.max_text_len = limit.min(MAX_TEXT_LENGTH);
        self
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => {
                self.write_null();
                Ok(())
            }
            Value::Integer(n) => {
                self.write_integer(*n);
                Ok(())
            }
            Value::Text(s) => self.write_text(s),
            Value::Array(items) => {
                self.write_array_header(items.len());
                for item in items {
                    self.encode(item)?;
                }
                Ok(())
            }
        }
    }

    /// Write a null (simple value 22).
    pub fn write_null(&mut self) {
        self.buffer.push(0xf6);
    }

    /// Write a signed integer in its shortest form.
    #[allow(clippy::cast_sign_loss)]
    pub fn write_integer(&mut self, n: i64) {
        if n >= 0 {
            self.write_head(0, n as u64);
        } else {
            // CBOR negative integers encode -(n+1)
            let abs_minus_one = (-(n + 1)) as u64;
            self.write_head(1, abs_minus_one);
        }
    }

    /// Write a UTF-8 text string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::SizeLimitExceeded`] if the text is longer than
    /// the encoder's text limit. Nothing is written in that case.
    pub fn write_text(&mut self, text: &str) -> CodecResult<()> {
        let len = text.len() as u64;
        if len > self.max_text_len {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: self.max_text_len,
            });
        }
        self.write_head(3, len);
        self.buffer.extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// Write a definite-length array header.
    pub fn write_array_header(&mut self, len: usize) {
        self.write_head(4, len as u64);
    }

    /// Number of bytes encoded so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been encoded.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard everything encoded so far, keeping the allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Roll the buffer back to `len` bytes.
    ///
    /// Used to drop a partially written item after a failed write.
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len);
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_head(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}
