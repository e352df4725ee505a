//! Side channel to a text logging facade.
//!
//! A rotator with a sink forwards `serial + " " + data` and the cause to it
//! before each binary write. The binary page is written either way.

use std::error::Error;

/// Receiver of bridged log lines.
pub trait LegacySink: Send + Sync {
    /// Forward one emitted record.
    fn forward(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// Bridges records into `tracing` as debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LegacySink for TracingSink {
    fn forward(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => tracing::debug!(stream = message, cause = %cause, "pagelog"),
            None => tracing::debug!(stream = message, "pagelog"),
        }
    }
}
