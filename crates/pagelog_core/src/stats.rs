//! Manager accounting.
//!
//! `created` and `deleted` back the accounting identity
//! `active + deleted == created`. Both only grow; `active` is derived at
//! read time and never stored.
//!
//! # Usage
//!
//! ```rust
//! use pagelog_core::{Manager, StaticContext};
//! use std::sync::Arc;
//!
//! let manager = Manager::with_defaults();
//! let mut log = manager.rotator(Arc::new(StaticContext::new("orders")));
//! log.info(&"started");
//! log.flush();
//!
//! let stats = manager.stats();
//! assert_eq!(stats.active + stats.deleted, stats.created);
//! assert_eq!(stats.records_written, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Page and record counters for a manager.
///
/// Page lifecycle counters use sequentially consistent ordering so that a
/// snapshot can never observe more deletions than creations. The rest are
/// plain event counts.
#[derive(Debug, Default)]
pub struct ManagerStats {
    // Page lifecycle
    /// Pages allocated. Doubles as the page id source.
    created: AtomicU64,
    /// Pages that left the live state.
    deleted: AtomicU64,

    // Reclamation
    /// Eviction sweeps performed.
    sweeps: AtomicU64,
    /// Pages dropped by the hard-bound pass.
    forced_evictions: AtomicU64,
    /// Pages released for falling off a diagnostic chain.
    chain_evictions: AtomicU64,

    // Records
    /// Records encoded into a page.
    records_written: AtomicU64,
    /// Encoded bytes.
    bytes_written: AtomicU64,
    /// Records lost to an absent page or an encoding failure.
    records_dropped: AtomicU64,
}

impl ManagerStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    /// Counts a new page and returns its id. Ids start at 1.
    pub(crate) fn record_created(&self) -> u64 {
        self.created.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Counts a page leaving the live state.
    pub(crate) fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forced_evictions(&self, count: u64) {
        self.forced_evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_chain_eviction(&self) {
        self.chain_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an encoded record of `bytes` bytes.
    pub(crate) fn record_write(&self, bytes: u64) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of pages allocated.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Returns the number of pages that left the live state.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Returns the number of live pages.
    pub fn active(&self) -> u64 {
        let deleted = self.deleted();
        self.created().saturating_sub(deleted)
    }

    /// Returns the number of eviction sweeps.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Returns the number of pages dropped by the hard-bound pass.
    pub fn forced_evictions(&self) -> u64 {
        self.forced_evictions.load(Ordering::Relaxed)
    }

    /// Returns the number of pages released off a diagnostic chain.
    pub fn chain_evictions(&self) -> u64 {
        self.chain_evictions.load(Ordering::Relaxed)
    }

    /// Returns the number of records written.
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Returns the number of encoded bytes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of records lost.
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    ///
    /// `deleted` is read before `created`, so `active` is never negative
    /// and `active + deleted == created` holds in every snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let deleted = self.deleted();
        let created = self.created();
        StatsSnapshot {
            active: created - deleted,
            created,
            deleted,
            sweeps: self.sweeps(),
            forced_evictions: self.forced_evictions(),
            chain_evictions: self.chain_evictions(),
            records_written: self.records_written(),
            bytes_written: self.bytes_written(),
            records_dropped: self.records_dropped(),
        }
    }
}

/// A point-in-time snapshot of manager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Live pages: `created - deleted`.
    pub active: u64,
    /// Pages allocated.
    pub created: u64,
    /// Pages that left the live state.
    pub deleted: u64,
    /// Eviction sweeps performed.
    pub sweeps: u64,
    /// Pages dropped by the hard-bound pass.
    pub forced_evictions: u64,
    /// Pages released off a diagnostic chain.
    pub chain_evictions: u64,
    /// Records written.
    pub records_written: u64,
    /// Encoded bytes.
    pub bytes_written: u64,
    /// Records lost.
    pub records_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let stats = ManagerStats::new();
        assert_eq!(stats.record_created(), 1);
        assert_eq!(stats.record_created(), 2);
        assert_eq!(stats.created(), 2);
    }

    #[test]
    fn active_is_derived() {
        let stats = ManagerStats::new();
        stats.record_created();
        stats.record_created();
        stats.record_created();
        stats.record_deleted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.created, 3);
        assert_eq!(snapshot.deleted, 1);
        assert_eq!(snapshot.active, 2);
        assert_eq!(stats.active(), 2);
    }

    #[test]
    fn record_counters() {
        let stats = ManagerStats::new();
        stats.record_write(12);
        stats.record_write(30);
        stats.record_drop();
        stats.record_sweep();
        stats.record_forced_evictions(4);
        stats.record_chain_eviction();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_written, 2);
        assert_eq!(snapshot.bytes_written, 42);
        assert_eq!(snapshot.records_dropped, 1);
        assert_eq!(snapshot.sweeps, 1);
        assert_eq!(snapshot.forced_evictions, 4);
        assert_eq!(snapshot.chain_evictions, 1);
    }

    #[test]
    fn snapshot_default_is_zero() {
        assert_eq!(ManagerStats::new().snapshot(), StatsSnapshot::default());
    }
}
