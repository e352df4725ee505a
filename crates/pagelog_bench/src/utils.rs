//! Benchmark utilities.

use pagelog_codec::LogRecord;
use pagelog_core::Level;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random alphanumeric payload of `size` bytes.
pub fn random_payload(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

/// Generate a random level.
pub fn random_level() -> Level {
    Level::ALL[rand::thread_rng().gen_range(0..Level::ALL.len())]
}

/// Generate records with payloads of `payload_size` bytes.
pub fn generate_records(count: usize, payload_size: usize) -> Vec<LogRecord> {
    (0..count)
        .map(|i| LogRecord {
            name: format!("{{bench-{}}}", i % 8),
            level: random_level().as_numeric(),
            data: random_payload(payload_size),
            cause_messages: None,
            stack_trace: None,
        })
        .collect()
}
