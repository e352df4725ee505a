//! Cross-crate integration test helpers.
//!
//! Drives rotators through the core crate and checks the export through
//! the codec crate.

use pagelog_codec::{LogRecord, RecordIter};
use pagelog_core::{Level, Manager, ManagerConfig, Rotator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::fixtures::context;

/// Per-stream record counts of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Records per stream name.
    pub streams: BTreeMap<String, usize>,
    /// Records per numeric level.
    pub levels: BTreeMap<i32, usize>,
    /// Records carrying a cause.
    pub with_cause: usize,
}

impl ExportSummary {
    /// Summarize decoded records.
    pub fn from_records(records: &[LogRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            *summary.streams.entry(record.name.clone()).or_default() += 1;
            *summary.levels.entry(record.level).or_default() += 1;
            if record.cause_messages.is_some() {
                summary.with_cause += 1;
            }
        }
        summary
    }

    /// Total record count.
    pub fn total(&self) -> usize {
        self.streams.values().sum()
    }

    /// Renders the summary as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Summary serializes to JSON")
    }
}

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The manager instance.
    pub manager: Arc<Manager>,
    rotators: BTreeMap<String, Rotator>,
    emitted: usize,
}

impl IntegrationHarness {
    /// Creates a new integration harness.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            manager: Manager::new(config).expect("Invalid harness configuration"),
            rotators: BTreeMap::new(),
            emitted: 0,
        }
    }

    /// The rotator for `stream`, created on first use.
    pub fn stream(&mut self, stream: &str) -> &mut Rotator {
        let manager = &self.manager;
        self.rotators
            .entry(stream.to_string())
            .or_insert_with(|| manager.rotator(context(stream)))
    }

    /// Logs through `stream` and tracks whether the call should emit.
    pub fn log(&mut self, stream: &str, level: Level, data: &str) {
        let rotator = self.stream(stream);
        let emits = rotator.is_enabled(level);
        rotator.log(level, Some(&data), None);
        if emits {
            self.emitted += 1;
        }
    }

    /// Flushes every stream.
    pub fn flush_all(&mut self) {
        for rotator in self.rotators.values_mut() {
            rotator.flush();
        }
    }

    /// Number of calls that passed the level filter.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Decodes the export, checking it streams cleanly record by record.
    pub fn decoded(&self) -> Vec<LogRecord> {
        let bytes = self.manager.bytes();
        RecordIter::new(&bytes)
            .collect::<Result<Vec<_>, _>>()
            .expect("Export should decode")
    }

    /// Verifies accounting and that every emitted record is either in the
    /// export, dropped, or on a reclaimed page.
    pub fn verify(&self) {
        let stats = self.manager.stats();
        assert_eq!(stats.active + stats.deleted, stats.created);
        assert_eq!(
            (stats.records_written + stats.records_dropped) as usize,
            self.emitted,
            "Every emitted call is written or dropped"
        );
        assert!(self.decoded().len() <= stats.records_written as usize);
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

/// End-to-end rotation scenarios.
pub mod end_to_end {
    use super::*;
    use crate::fixtures::{ChainError, TestManager};
    use pagelog_core::cause::MAX_CAUSE_DEPTH;

    /// Logs three INFO records into 10-byte pages and checks the export.
    pub fn small_pages_rotate() {
        let test = TestManager::with_capacity(10);
        let mut log = test.rotator("rotation");
        let mut page_ids = Vec::new();

        for i in 0..3 {
            log.info(&format_args!("entry {i}"));
            page_ids.extend(log.current_page_id());
        }
        page_ids.dedup();
        assert!(page_ids.len() >= 2, "Expected a rotation, saw {page_ids:?}");
        assert!(page_ids.windows(2).all(|w| w[0] < w[1]));

        let bytes = test.bytes();
        assert!(!bytes.is_empty());
        let records = test.records().expect("Export should decode");
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.level == 4));
        log.flush();
        test.assert_accounting();
    }

    /// Logs a FATAL record whose cause chain has `depth` errors and returns
    /// the number of rendered groups.
    pub fn fatal_with_chain(depth: usize) -> usize {
        let test = TestManager::default();
        let mut log = test.rotator("causes");
        log.fatal_with(&"fatal failure", &ChainError::nested(depth));
        log.flush();

        let records = test.records().expect("Export should decode");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Fatal.as_numeric());
        let causes = records[0].cause_messages.as_deref().expect("Cause present");
        assert!(causes.starts_with("[ChainError, level 0],"));
        assert!(records[0].cause_count() <= MAX_CAUSE_DEPTH);
        records[0].cause_count()
    }

    /// Flushes, then checks that the export holds only pre-flush records.
    pub fn flush_then_export() {
        let test = TestManager::default();
        let mut log = test.rotator("flush");
        log.info(&"before flush");
        log.flush();

        let before = test.bytes();
        let records = test.records().expect("Export should decode");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, "before flush");

        // Logging again allocates a new page; the flushed one is untouched.
        log.info(&"after flush");
        let after = test.records().expect("Export should decode");
        assert_eq!(after.len(), 2);
        assert!(test.bytes().starts_with(&before));
        log.flush();
    }

    /// Pushes live pages past the bound and checks the next allocation
    /// brings them back under it.
    pub fn bound_is_restored(max_pages: u64) {
        let config = ManagerConfig::new().max_pages(max_pages);
        let test = TestManager::with_config(config);
        let mut streams: Vec<Rotator> = Vec::new();

        loop {
            let mut rotator = test.rotator(&format!("idle-{}", streams.len()));
            rotator.info(&"hold a page open");
            streams.push(rotator);
            let stats = test.stats();
            assert!(
                stats.active <= max_pages,
                "Allocation left {} live pages over a bound of {max_pages}",
                stats.active
            );
            if stats.forced_evictions > 0 {
                break;
            }
        }
        test.assert_accounting();
        for rotator in &mut streams {
            rotator.flush();
        }
        assert_eq!(test.stats().active, 0);
    }
}
