//! Test fixtures and manager helpers.
//!
//! Provides ready-made contexts, nested error chains and managers sized
//! for the common test scenarios.

use pagelog_core::{LogContext, Manager, ManagerConfig, Rotator, StaticContext};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A shared context for `name`.
pub fn context(name: &str) -> Arc<dyn LogContext> {
    Arc::new(StaticContext::new(name))
}

/// A manager with a small page size and a roomy eviction bound.
pub struct TestManager {
    /// The manager instance.
    pub manager: Arc<Manager>,
}

impl TestManager {
    /// Pages of `capacity` bytes, default bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(ManagerConfig::new().page_capacity(capacity))
    }

    /// A manager for `config`.
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            manager: Manager::new(config).expect("Invalid test configuration"),
        }
    }

    /// A rotator for the stream `name`.
    pub fn rotator(&self, name: &str) -> Rotator {
        self.manager.rotator(context(name))
    }

    /// Asserts `active + deleted == created` on a fresh snapshot.
    pub fn assert_accounting(&self) {
        let stats = self.manager.stats();
        assert_eq!(
            stats.active + stats.deleted,
            stats.created,
            "Accounting identity broken: {stats:?}"
        );
    }
}

impl Default for TestManager {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}

impl std::ops::Deref for TestManager {
    type Target = Manager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Runs a test with a fresh manager and one rotator named `test`.
///
/// The rotator is flushed after `f` returns.
///
/// # Example
///
/// ```
/// use pagelog_testkit::with_rotator;
///
/// let records = with_rotator(4096, |log| log.info(&"hello"));
/// assert_eq!(records[0].data, "hello");
/// ```
pub fn with_rotator<F>(capacity: usize, f: F) -> Vec<pagelog_codec::LogRecord>
where
    F: FnOnce(&mut Rotator),
{
    let test = TestManager::with_capacity(capacity);
    let mut rotator = test.rotator("test");
    f(&mut rotator);
    rotator.flush();
    test.assert_accounting();
    test.records().expect("Export should decode")
}

/// An error with a configurable chain of sources.
///
/// `ChainError::nested(3)` renders as `level 0` caused by `level 1`
/// caused by `level 2`.
#[derive(Debug)]
pub struct ChainError {
    depth: usize,
    source: Option<Box<ChainError>>,
}

impl ChainError {
    /// A chain of `len` errors, outermost at depth 0.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn nested(len: usize) -> Self {
        assert!(len > 0, "A chain needs at least one error");
        let mut error = ChainError {
            depth: len - 1,
            source: None,
        };
        for depth in (0..len - 1).rev() {
            error = ChainError {
                depth,
                source: Some(Box::new(error)),
            };
        }
        error
    }

    /// Number of errors in the chain starting here.
    pub fn len(&self) -> usize {
        1 + self.source.as_ref().map_or(0, |s| s.len())
    }

    /// Always false; a chain holds at least one error.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.depth)
    }
}

impl Error for ChainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A manager where each of `records` INFO records fills a page.
    ///
    /// The rotator is returned unflushed.
    pub fn one_record_per_page(records: usize) -> (TestManager, Rotator) {
        let test = TestManager::with_capacity(10);
        let mut rotator = test.rotator("rotation");
        for i in 0..records {
            rotator.info(&format_args!("record number {i}"));
        }
        (test, rotator)
    }

    /// A manager with `streams` rotators, each holding one unfilled page.
    pub fn idle_streams(config: ManagerConfig, streams: usize) -> (TestManager, Vec<Rotator>) {
        let test = TestManager::with_config(config);
        let rotators = (0..streams)
            .map(|i| {
                let mut rotator = test.rotator(&format!("stream-{i}"));
                rotator.info(&"opened");
                rotator
            })
            .collect();
        (test, rotators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelog_core::RotatorState;

    #[test]
    fn test_chain_error_depth() {
        let error = ChainError::nested(4);
        assert_eq!(error.len(), 4);
        assert_eq!(error.to_string(), "level 0");
        assert_eq!(error.source().unwrap().to_string(), "level 1");
    }

    #[test]
    fn test_with_rotator() {
        let records = with_rotator(4096, |log| {
            log.warn(&"careful");
            log.debug(&"filtered");
        });
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "{test}");
    }

    #[test]
    fn test_one_record_per_page() {
        let (test, rotator) = scenarios::one_record_per_page(3);
        assert_eq!(test.stats().created, 3);
        assert_eq!(rotator.current_page_id(), Some(3));
        test.assert_accounting();
    }

    #[test]
    fn test_idle_streams() {
        let (test, rotators) = scenarios::idle_streams(ManagerConfig::new(), 5);
        assert!(rotators.iter().all(|r| r.state() == RotatorState::Active));
        assert_eq!(test.stats().active, 5);
    }
}
