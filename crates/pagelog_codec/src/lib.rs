//! # pagelog Codec
//!
//! The fixed, versionless binary schema for pagelog records.
//!
//! Every record is encoded as one canonical CBOR array:
//!
//! | field | type | notes |
//! |---|---|---|
//! | name | text | caller's pre-serialized stream identity |
//! | level | int | severity rank, 1-6 |
//! | data | text | caller-serialized payload |
//! | causeMessages | text or null | up to 10 `[type, message],` groups |
//! | stackTrace | text or null | present only if stack dumping is on |
//!
//! Records are appended back to back with no separators, so a page (or a
//! concatenation of pages) is decoded by streaming record after record.
//!
//! ## Canonical CBOR Rules
//!
//! - Integers use shortest encoding
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - Only null, integers, text and arrays appear
//!
//! ## Usage
//!
//! ```
//! use pagelog_codec::{decode_records, encode_record, CanonicalEncoder, RecordRef};
//!
//! let mut encoder = CanonicalEncoder::new();
//! let record = RecordRef {
//!     name: "{checkout}",
//!     level: 4,
//!     data: "order placed",
//!     cause_messages: None,
//!     stack_trace: None,
//! };
//! encode_record(&mut encoder, &record).unwrap();
//!
//! let records = decode_records(encoder.as_bytes()).unwrap();
//! assert_eq!(records[0].data, "order placed");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod record;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder, MAX_TEXT_LENGTH};
pub use error::{CodecError, CodecResult};
pub use record::{decode_records, encode_record, LogRecord, RecordIter, RecordRef, RECORD_FIELDS};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roundtrip_value() {
        let value = Value::Array(vec![
            Value::from("name"),
            Value::Integer(-7),
            Value::Null,
            Value::Array(vec![Value::Integer(300)]),
        ]);
        let bytes = to_canonical_cbor(&value).unwrap();
        assert_eq!(from_cbor(&bytes).unwrap(), value);
    }

    proptest! {
        #[test]
        fn records_survive_encoding(
            name in ".{0,40}",
            level in 1i32..=6,
            data in ".{0,200}",
            cause in proptest::option::of(".{0,60}"),
            stack in proptest::option::of(".{0,60}"),
        ) {
            let record = LogRecord {
                name,
                level,
                data,
                cause_messages: cause,
                stack_trace: stack,
            };
            let mut encoder = CanonicalEncoder::new();
            encode_record(&mut encoder, &record.as_record_ref()).unwrap();
            let decoded = decode_records(encoder.as_bytes()).unwrap();
            prop_assert_eq!(decoded, vec![record]);
        }
    }
}
