//! Property-based test generators using proptest.
//!
//! Provides strategies for levels, payloads, records and sequences of log
//! calls against a rotator.

use pagelog_codec::LogRecord;
use pagelog_core::{Level, Rotator};
use proptest::prelude::*;

use crate::fixtures::ChainError;

/// Strategy for generating levels.
pub fn level_strategy() -> impl Strategy<Value = Level> {
    prop::sample::select(Level::ALL.to_vec())
}

/// Strategy for generating numeric ranks, valid or not.
pub fn numeric_rank_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![
        3 => 1..=6i32,
        1 => any::<i32>(),
    ]
}

/// Strategy for generating payload text.
pub fn data_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 =@.{}/_-]{0,64}").expect("Invalid regex")
}

/// Strategy for generating stream names.
pub fn stream_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating cause fields of 1 to 10 groups.
pub fn cause_messages_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(("[A-Z][a-zA-Z]{0,11}", "[a-z ]{0,20}"), 1..=10).prop_map(|groups| {
        groups
            .into_iter()
            .map(|(kind, message)| format!("[{kind}, {message}],"))
            .collect()
    })
}

/// Strategy for generating decoded records.
pub fn log_record_strategy() -> impl Strategy<Value = LogRecord> {
    (
        stream_name_strategy(),
        level_strategy(),
        data_strategy(),
        prop::option::of(cause_messages_strategy()),
        prop::option::of("[a-z0-9 :\n]{0,80}"),
    )
        .prop_map(|(name, level, data, cause_messages, stack_trace)| LogRecord {
            name: format!("{{{name}}}"),
            level: level.as_numeric(),
            data,
            cause_messages,
            stack_trace,
        })
}

/// A call against a rotator.
#[derive(Debug, Clone)]
pub enum LogCall {
    /// Log `data` at `level`.
    Log {
        /// Call level
        level: Level,
        /// Payload
        data: String,
    },
    /// Log `data` at `level` with a cause chain of `depth` errors.
    LogWithCause {
        /// Call level
        level: Level,
        /// Payload
        data: String,
        /// Chain length
        depth: usize,
    },
    /// Log without a payload.
    Missing {
        /// Call level
        level: Level,
    },
    /// Give the current page back.
    Flush,
}

impl LogCall {
    /// Apply this call to `rotator`.
    pub fn apply(&self, rotator: &mut Rotator) {
        match self {
            LogCall::Log { level, data } => rotator.log(*level, Some(data), None),
            LogCall::LogWithCause { level, data, depth } => {
                let cause = ChainError::nested(*depth);
                rotator.log(*level, Some(data), Some(&cause));
            }
            LogCall::Missing { level } => rotator.log(*level, None, None),
            LogCall::Flush => rotator.flush(),
        }
    }

    /// Whether this call writes a record at threshold `threshold`.
    pub fn emits_at(&self, threshold: Level) -> bool {
        match self {
            LogCall::Log { level, .. } | LogCall::LogWithCause { level, .. } => {
                level.is_enabled_at(threshold)
            }
            LogCall::Missing { .. } | LogCall::Flush => false,
        }
    }
}

/// Strategy for generating log calls.
pub fn log_call_strategy() -> impl Strategy<Value = LogCall> {
    prop_oneof![
        6 => (level_strategy(), data_strategy())
            .prop_map(|(level, data)| LogCall::Log { level, data }),
        2 => (level_strategy(), data_strategy(), 1..=15usize)
            .prop_map(|(level, data, depth)| LogCall::LogWithCause { level, data, depth }),
        1 => level_strategy().prop_map(|level| LogCall::Missing { level }),
        1 => Just(LogCall::Flush),
    ]
}

/// Strategy for generating a sequence of log calls.
pub fn call_sequence_strategy(
    min_calls: usize,
    max_calls: usize,
) -> impl Strategy<Value = Vec<LogCall>> {
    prop::collection::vec(log_call_strategy(), min_calls..max_calls)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
