//! Severity levels.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// Severity rank of a log call.
///
/// Lower numbers are more severe. A call at level `L` is emitted by a
/// stream whose threshold is `T` iff `L <= T`, so a stream at `Info` emits
/// `Fatal`, `Error`, `Warn` and `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    /// Unrecoverable failure.
    Fatal = 1,
    /// Operation failed.
    Error = 2,
    /// Something unexpected, work continues.
    Warn = 3,
    /// Normal operational messages.
    #[default]
    Info = 4,
    /// Diagnostic detail.
    Debug = 5,
    /// Very fine-grained detail.
    Trace = 6,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 6] = [
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Level for a numeric rank.
    ///
    /// Ranks outside `1..=6` resolve to [`Level::Info`].
    #[must_use]
    pub const fn from_numeric(numeric: i32) -> Self {
        match numeric {
            1 => Level::Fatal,
            2 => Level::Error,
            3 => Level::Warn,
            5 => Level::Debug,
            6 => Level::Trace,
            _ => Level::Info,
        }
    }

    /// Numeric rank, as written to the `level` field.
    #[must_use]
    pub const fn as_numeric(self) -> i32 {
        self as i32
    }

    /// Whether a call at this level passes a stream threshold of `threshold`.
    #[inline]
    #[must_use]
    pub const fn is_enabled_at(self, threshold: Level) -> bool {
        (self as u8) <= (threshold as u8)
    }

    /// Upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = CoreError;

    /// Parses a level name (any case) or a rank from 1 to 6.
    fn from_str(s: &str) -> CoreResult<Self> {
        let trimmed = s.trim();
        if let Ok(numeric) = trimmed.parse::<i32>() {
            return if (1..=6).contains(&numeric) {
                Ok(Level::from_numeric(numeric))
            } else {
                Err(CoreError::invalid_level(s))
            };
        }
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::invalid_level(s))
    }
}
