//! The fixed log record schema.
//!
//! A record is one CBOR array of five items, in this order:
//!
//! ```text
//! [ name: text, level: int, data: text, causeMessages: text|null, stackTrace: text|null ]
//! ```
//!
//! Records are concatenated without framing. A reader walks the buffer with
//! [`RecordIter`] (or [`decode_records`]) until it is exhausted.

use crate::decoder::CanonicalDecoder;
use crate::encoder::CanonicalEncoder;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::Serialize;

/// Number of fields in a log record.
pub const RECORD_FIELDS: usize = 5;

/// A borrowed record, ready to be encoded.
///
/// Pages encode straight from the caller's strings through this view, so
/// nothing about the record is retained after the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef<'a> {
    /// Pre-serialized stream identity.
    pub name: &'a str,
    /// Severity rank.
    pub level: i32,
    /// Caller-serialized payload.
    pub data: &'a str,
    /// Concatenated `[type, message],` groups of the cause chain.
    pub cause_messages: Option<&'a str>,
    /// Stack field, present only when stack dumping is on.
    pub stack_trace: Option<&'a str>,
}

/// A decoded log record.
///
/// Serializes to JSON with the schema's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Pre-serialized stream identity.
    pub name: String,
    /// Severity rank.
    pub level: i32,
    /// Caller-serialized payload.
    pub data: String,
    /// Concatenated `[type, message],` groups of the cause chain.
    pub cause_messages: Option<String>,
    /// Stack field, present only when stack dumping is on.
    pub stack_trace: Option<String>,
}

impl LogRecord {
    /// Borrow this record for encoding.
    #[must_use]
    pub fn as_record_ref(&self) -> RecordRef<'_> {
        RecordRef {
            name: &self.name,
            level: self.level,
            data: &self.data,
            cause_messages: self.cause_messages.as_deref(),
            stack_trace: self.stack_trace.as_deref(),
        }
    }

    /// Number of `[type, message],` groups in the cause field.
    #[must_use]
    pub fn cause_count(&self) -> usize {
        self.cause_messages
            .as_deref()
            .map_or(0, |messages| messages.matches("],").count())
    }

    /// Build a record from a decoded CBOR value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidRecord`] if the value is not a
    /// five-element array with the schema's field types.
    pub fn from_value(value: Value) -> CodecResult<Self> {
        let Value::Array(fields) = value else {
            return Err(CodecError::invalid_record(format!(
                "expected array, got {}",
                value.type_name()
            )));
        };
        if fields.len() != RECORD_FIELDS {
            return Err(CodecError::invalid_record(format!(
                "expected {RECORD_FIELDS} fields, got {}",
                fields.len()
            )));
        }

        let mut fields = fields.into_iter();
        let name = required_text(fields.next(), "name")?;
        let level = match fields.next() {
            Some(Value::Integer(n)) => i32::try_from(n)
                .map_err(|_| CodecError::invalid_record(format!("level {n} out of range")))?,
            other => return Err(field_type_error("level", "integer", other.as_ref())),
        };
        let data = required_text(fields.next(), "data")?;
        let cause_messages = optional_text(fields.next(), "causeMessages")?;
        let stack_trace = optional_text(fields.next(), "stackTrace")?;

        Ok(Self {
            name,
            level,
            data,
            cause_messages,
            stack_trace,
        })
    }
}

fn required_text(value: Option<Value>, field: &str) -> CodecResult<String> {
    match value {
        Some(Value::Text(s)) => Ok(s),
        other => Err(field_type_error(field, "text", other.as_ref())),
    }
}

fn optional_text(value: Option<Value>, field: &str) -> CodecResult<Option<String>> {
    match value {
        Some(Value::Text(s)) => Ok(Some(s)),
        Some(Value::Null) => Ok(None),
        other => Err(field_type_error(field, "text or null", other.as_ref())),
    }
}

fn field_type_error(field: &str, expected: &str, got: Option<&Value>) -> CodecError {
    let got = got.map_or("nothing", Value::type_name);
    CodecError::invalid_record(format!("{field}: expected {expected}, got {got}"))
}

/// Append one record to `encoder`.
///
/// On error the encoder is rolled back to where it was, so a failed write
/// never leaves half a record behind.
///
/// # Errors
///
/// Returns an error if a text field exceeds the encoder's text limit.
pub fn encode_record(encoder: &mut CanonicalEncoder, record: &RecordRef<'_>) -> CodecResult<()> {
    let start = encoder.len();
    let result = write_fields(encoder, record);
    if result.is_err() {
        encoder.truncate(start);
    }
    result
}

fn write_fields(encoder: &mut CanonicalEncoder, record: &RecordRef<'_>) -> CodecResult<()> {
    encoder.write_array_header(RECORD_FIELDS);
    encoder.write_text(record.name)?;
    encoder.write_integer(i64::from(record.level));
    encoder.write_text(record.data)?;
    match record.cause_messages {
        Some(messages) => encoder.write_text(messages)?,
        None => encoder.write_null(),
    }
    match record.stack_trace {
        Some(stack) => encoder.write_text(stack)?,
        None => encoder.write_null(),
    }
    Ok(())
}

/// Streaming iterator over concatenated records.
///
/// Yields one `Err` and then stops if the buffer is malformed or ends in
/// the middle of a record.
pub struct RecordIter<'a> {
    decoder: CanonicalDecoder<'a>,
    failed: bool,
}

impl<'a> RecordIter<'a> {
    /// Iterate over the records in `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            decoder: CanonicalDecoder::new(bytes),
            failed: false,
        }
    }
}

impl Iterator for RecordIter<'_> {
    type Item = CodecResult<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.decoder.is_empty() {
            return None;
        }
        let result = self.decoder.decode().and_then(LogRecord::from_value);
        self.failed = result.is_err();
        Some(result)
    }
}

/// Decode every record in `bytes`.
///
/// # Errors
///
/// Returns the first decoding error encountered.
pub fn decode_records(bytes: &[u8]) -> CodecResult<Vec<LogRecord>> {
    RecordIter::new(bytes).collect()
}
