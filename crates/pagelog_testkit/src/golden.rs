//! Golden test utilities for format verification.
//!
//! Provides helpers for verifying that exported pages match expected
//! golden files, byte for byte or as JSON lines.

use pagelog_codec::LogRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// A golden test that compares output against expected files.
pub struct GoldenTest {
    name: String,
    golden_dir: PathBuf,
    update_mode: bool,
}

impl GoldenTest {
    /// Creates a new golden test.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the test (used for file naming)
    /// * `golden_dir` - Directory containing golden files
    pub fn new(name: impl Into<String>, golden_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            golden_dir: golden_dir.as_ref().to_path_buf(),
            update_mode: std::env::var("UPDATE_GOLDEN").is_ok(),
        }
    }

    /// Creates a golden test using the default test vectors directory.
    pub fn with_default_dir(name: impl Into<String>) -> Self {
        // Look for test_vectors in the workspace root
        let golden_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.join("docs").join("test_vectors"))
            .unwrap_or_else(|| PathBuf::from("test_vectors"));

        Self::new(name, golden_dir)
    }

    /// Asserts that the given bytes match the golden file.
    ///
    /// If `UPDATE_GOLDEN` environment variable is set, updates the golden file instead.
    pub fn assert_bytes(&self, suffix: &str, actual: &[u8]) {
        let path = self.file_path(suffix);

        if self.update_mode {
            self.update_golden_file(&path, actual);
            return;
        }

        if !path.exists() {
            panic!(
                "Golden file not found: {:?}\n\
                 Run with UPDATE_GOLDEN=1 to create it.\n\
                 Actual bytes (hex): {}",
                path,
                hex_encode(actual)
            );
        }

        let expected = fs::read(&path).expect("Failed to read golden file");

        if actual != expected {
            panic!(
                "Golden test '{}' failed for '{}':\n\
                 Expected ({} bytes): {}\n\
                 Actual ({} bytes): {}\n\
                 Run with UPDATE_GOLDEN=1 to update.",
                self.name,
                suffix,
                expected.len(),
                hex_encode(&expected),
                actual.len(),
                hex_encode(actual)
            );
        }
    }

    /// Asserts that the given string matches the golden file.
    pub fn assert_text(&self, suffix: &str, actual: &str) {
        let path = self.file_path(suffix);

        if self.update_mode {
            self.update_golden_file(&path, actual.as_bytes());
            return;
        }

        if !path.exists() {
            panic!(
                "Golden file not found: {:?}\n\
                 Run with UPDATE_GOLDEN=1 to create it.\n\
                 Actual:\n{}",
                path, actual
            );
        }

        let expected = fs::read_to_string(&path).expect("Failed to read golden file");

        if actual != expected {
            panic!(
                "Golden test '{}' failed for '{}':\n\
                 --- Expected ---\n{}\n\
                 --- Actual ---\n{}\n\
                 Run with UPDATE_GOLDEN=1 to update.",
                self.name, suffix, expected, actual
            );
        }
    }

    /// Asserts that decoded records match the golden JSON lines file.
    pub fn assert_records(&self, suffix: &str, records: &[LogRecord]) {
        self.assert_text(suffix, &records_to_json_lines(records));
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        let filename = if suffix.is_empty() {
            format!("{}.golden", self.name)
        } else {
            format!("{}_{}.golden", self.name, suffix)
        };
        self.golden_dir.join(filename)
    }

    fn update_golden_file(&self, path: &Path, data: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create golden directory");
        }
        fs::write(path, data).expect("Failed to write golden file");
        println!("Updated golden file: {:?}", path);
    }
}

/// Renders records as JSON, one object per line.
pub fn records_to_json_lines(records: &[LogRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let mut line = serde_json::to_string(record).expect("Records serialize to JSON");
            line.push('\n');
            line
        })
        .collect()
}

/// Encodes bytes as hexadecimal string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decodes hexadecimal string to bytes.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    let hex = hex.replace([' ', '\n', '\r'], "");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex"))
        .collect()
}

/// Encoded record vectors for cross-language readers.
pub mod record_vectors {
    use pagelog_codec::LogRecord;

    /// A record and its expected encoding.
    #[derive(Debug, Clone)]
    pub struct RecordTestVector {
        /// Description of the test case
        pub description: &'static str,
        /// The record
        pub record: LogRecord,
        /// Expected bytes (hex-encoded)
        pub expected_hex: &'static str,
    }

    fn record(
        name: &str,
        level: i32,
        data: &str,
        cause_messages: Option<&str>,
        stack_trace: Option<&str>,
    ) -> LogRecord {
        LogRecord {
            name: name.to_string(),
            level,
            data: data.to_string(),
            cause_messages: cause_messages.map(str::to_string),
            stack_trace: stack_trace.map(str::to_string),
        }
    }

    /// Returns the standard record vectors.
    #[must_use]
    pub fn standard_vectors() -> Vec<RecordTestVector> {
        vec![
            RecordTestVector {
                description: "Empty data, no cause",
                record: record("{a}", 4, "", None, None),
                expected_hex: "85637b617d0460f6f6",
            },
            RecordTestVector {
                description: "Trace level",
                record: record("{x}", 6, "t", None, None),
                expected_hex: "85637b787d066174f6f6",
            },
            RecordTestVector {
                description: "Fatal with cause and stack placeholder",
                record: record(
                    "{svc}",
                    1,
                    "boom",
                    Some("[Error, boom],"),
                    Some("stack trace unavailable"),
                ),
                expected_hex: "85657b7376637d0164626f6f6d6e5b4572726f722c20626f6f6d5d2c\
                               77737461636b20747261636520756e617661696c61626c65",
            },
        ]
    }
}
