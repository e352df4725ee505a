//! Page allocation, eviction and export.

use crate::config::ManagerConfig;
use crate::context::LogContext;
use crate::error::CoreResult;
use crate::handle::{PageArena, PageHandle, Release};
use crate::legacy::LegacySink;
use crate::level::Level;
use crate::page::Page;
use crate::rotator::Rotator;
use crate::stats::{ManagerStats, StatsSnapshot};
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use pagelog_codec::{decode_records, LogRecord};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Owner of every page handle.
///
/// The manager is shared by all rotators of a process. It hands out pages,
/// tracks them in a concurrent set keyed by page id, and keeps the number
/// of live pages near [`ManagerConfig::max_pages`] with eviction sweeps run
/// from inside [`allocate`](Self::allocate).
///
/// ```
/// use pagelog_core::{Manager, ManagerConfig, StaticContext};
/// use std::sync::Arc;
///
/// let manager = Manager::new(ManagerConfig::new().page_capacity(4096)).unwrap();
/// let mut log = manager.rotator(Arc::new(StaticContext::new("billing")));
/// log.warn(&"card declined");
/// log.flush();
///
/// let records = manager.records().unwrap();
/// assert_eq!(records[0].data, "card declined");
/// ```
pub struct Manager {
    config: ManagerConfig,
    handles: DashMap<u64, PageHandle>,
    arena: PageArena,
    stats: ManagerStats,
    last_mark: AtomicU64,
    sweeping: AtomicBool,
    level: AtomicU8,
    legacy: RwLock<Option<Arc<dyn LegacySink>>>,
}

impl Manager {
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if the configuration is unusable.
    pub fn new(config: ManagerConfig) -> CoreResult<Arc<Self>> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a manager with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Arc<Self> {
        Self::build(ManagerConfig::default())
    }

    fn build(config: ManagerConfig) -> Arc<Self> {
        Arc::new(Self {
            arena: PageArena::new(config.spare_pages),
            level: AtomicU8::new(config.default_level as u8),
            config,
            handles: DashMap::new(),
            stats: ManagerStats::new(),
            last_mark: AtomicU64::new(0),
            sweeping: AtomicBool::new(false),
            legacy: RwLock::new(None),
        })
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// A new rotator for the stream identified by `context`.
    ///
    /// The rotator takes the manager's current level, stack setting and
    /// legacy sink. Rotators are cheap; create one per thread.
    pub fn rotator(self: &Arc<Self>, context: Arc<dyn LogContext>) -> Rotator {
        Rotator::new(
            Arc::clone(self),
            context,
            self.level(),
            self.config.dump_stack,
            self.legacy_sink(),
        )
    }

    /// Threshold given to new rotators.
    pub fn level(&self) -> Level {
        Level::from_numeric(i32::from(self.level.load(Ordering::Relaxed)))
    }

    /// Change the threshold given to new rotators.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Sink given to new rotators.
    pub fn legacy_sink(&self) -> Option<Arc<dyn LegacySink>> {
        self.legacy.read().clone()
    }

    /// Install or remove the sink given to new rotators.
    pub fn set_legacy_sink(&self, sink: Option<Arc<dyn LegacySink>>) {
        *self.legacy.write() = sink;
    }

    /// Allocate a page and return a live handle to it.
    ///
    /// `previous` is linked behind the new page as a diagnostic chain. The
    /// chain is cut at `max_chain_hops` and pages beyond the cut are
    /// reclaimed. After registering the page this may run an eviction sweep.
    pub fn allocate(&self, previous: Option<PageHandle>) -> PageHandle {
        let id = self.stats.record_created();
        let capacity = self.config.page_capacity;
        let mut page = match self.arena.take_spare() {
            Some(spare) => spare.reassign(id, capacity),
            None => Page::new(id, capacity),
        };
        page.set_previous(previous.filter(|handle| !handle.is_null()));

        let handle = self.arena.insert(page);
        self.trim_chain(&handle);
        self.handles.insert(id, handle.clone());
        self.maybe_sweep();
        handle
    }

    /// Retire a handle on behalf of its writer.
    ///
    /// `handle` stops resolving. The page stays exportable through the
    /// manager until a sweep reclaims it.
    pub fn return_page(&self, handle: &mut PageHandle) {
        if handle.clear() {
            self.stats.record_deleted();
        }
    }

    /// Concatenated bytes of every resolvable page, oldest page first.
    ///
    /// A diagnostic export: records from different streams interleave by
    /// page, not by time.
    pub fn bytes(&self) -> Bytes {
        let mut handles: Vec<PageHandle> =
            self.handles.iter().map(|entry| entry.value().clone()).collect();
        handles.sort_unstable();

        let mut out = BytesMut::new();
        for handle in &handles {
            if let Some(page) = handle.resolve() {
                out.extend_from_slice(page.bytes());
            }
        }
        out.freeze()
    }

    /// Decoded form of [`bytes`](Self::bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if the export does not decode as a record stream.
    pub fn records(&self) -> CoreResult<Vec<LogRecord>> {
        Ok(decode_records(&self.bytes())?)
    }

    /// Reclaim every tracked page and drop the spare pool.
    ///
    /// Rotators writing to a purged page drop their next record and then
    /// allocate a fresh page.
    pub fn purge(&self) {
        let victims = self.drain_where(|_| true);
        let released = self.release_all(&victims);
        self.arena.clear_spares();
        tracing::debug!(released, "purged all pages");
    }

    /// Number of handles currently tracked, retired ones included.
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn record_write(&self, bytes: usize) {
        self.stats.record_write(bytes as u64);
    }

    pub(crate) fn record_drop(&self) {
        self.stats.record_drop();
    }

    fn trim_chain(&self, head: &PageHandle) {
        let mut cursor = head.clone();
        for _ in 0..self.config.max_chain_hops {
            let next = cursor.resolve().and_then(|page| page.previous().cloned());
            match next {
                Some(next) => cursor = next,
                None => return,
            }
        }

        let mut tail = cursor.resolve().and_then(|mut page| page.take_previous());
        while let Some(handle) = tail {
            tail = handle.resolve().and_then(|mut page| page.take_previous());
            if self.release(&handle) != Release::Stale {
                self.stats.record_chain_eviction();
                tracing::debug!(page = handle.id(), head = head.id(), "page fell off chain");
            }
        }
    }

    fn maybe_sweep(&self) {
        let bound = self.config.max_pages;
        let mark = self.last_mark.load(Ordering::SeqCst);
        let created = self.stats.created();
        if created.saturating_sub(mark) <= bound && self.stats.active() <= bound {
            return;
        }
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if self
            .last_mark
            .compare_exchange(mark, created, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.sweep(created);
        }
        self.sweeping.store(false, Ordering::Release);
    }

    fn sweep(&self, created: u64) {
        let bound = self.config.max_pages;
        self.stats.record_sweep();

        let victims = self.drain_where(PageHandle::is_sweepable);
        let removed = self.release_all(&victims);

        let mut forced = 0;
        if self.stats.active() >= bound {
            let threshold = created.saturating_sub(bound / 2);
            let victims = self.drain_where(|handle| handle.id() <= threshold);
            forced = self.release_all(&victims);
            self.stats.record_forced_evictions(forced);
        }

        tracing::debug!(
            removed,
            forced,
            active = self.stats.active(),
            "eviction sweep"
        );
    }

    /// Remove matching handles from the set. Slots are locked one at a
    /// time under the shard lock; nothing is released here.
    fn drain_where(&self, predicate: impl Fn(&PageHandle) -> bool) -> Vec<PageHandle> {
        let mut victims = Vec::new();
        self.handles.retain(|_, handle| {
            if predicate(handle) {
                victims.push(handle.clone());
                false
            } else {
                true
            }
        });
        victims
    }

    fn release_all(&self, victims: &[PageHandle]) -> u64 {
        victims
            .iter()
            .map(|handle| u64::from(self.release(handle) != Release::Stale))
            .sum()
    }

    fn release(&self, handle: &PageHandle) -> Release {
        let outcome = self.arena.release(handle);
        if outcome == Release::WasLive {
            self.stats.record_deleted();
        }
        outcome
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("live_handles", &self.handles.len())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(capacity: usize, max_pages: u64) -> Arc<Manager> {
        Manager::new(
            ManagerConfig::new()
                .page_capacity(capacity)
                .max_pages(max_pages),
        )
        .unwrap()
    }

    fn fill(handle: &PageHandle) {
        let mut page = handle.resolve().unwrap();
        while !page.is_full() {
            page.append("{test}", Level::Info, "filler", None, false);
        }
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Manager::new(ManagerConfig::new().max_pages(1)).is_err());
    }

    #[test]
    fn allocate_assigns_increasing_ids() {
        let manager = manager(64, 16);
        let a = manager.allocate(None);
        let b = manager.allocate(None);
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(manager.live_handles(), 2);

        let stats = manager.stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn return_page_counts_once() {
        let manager = manager(64, 16);
        let mut handle = manager.allocate(None);
        manager.return_page(&mut handle);
        manager.return_page(&mut handle);

        assert!(handle.resolve().is_none());
        let stats = manager.stats();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.active, 0);
        // Retired pages stay tracked for export.
        assert_eq!(manager.live_handles(), 1);
    }

    #[test]
    fn chain_is_capped() {
        let manager = manager(64, 64);
        let mut handles = vec![manager.allocate(None)];
        for _ in 0..5 {
            let previous = handles.last().cloned();
            handles.push(manager.allocate(previous));
        }

        // Chain 6 -> 5 -> 4 -> 3; pages 1 and 2 fell off.
        assert!(handles[0].resolve().is_none());
        assert!(handles[1].resolve().is_none());
        assert!(handles[2].resolve().is_some());
        assert!(handles[2].resolve().unwrap().previous().is_none());
        assert_eq!(
            handles[5].resolve().unwrap().previous().map(PageHandle::id),
            Some(5)
        );

        let stats = manager.stats();
        assert_eq!(stats.chain_evictions, 2);
        assert_eq!(stats.active + stats.deleted, stats.created);
    }

    #[test]
    fn sweep_removes_full_and_retired() {
        let manager = manager(16, 4);
        let full = manager.allocate(None);
        fill(&full);
        let mut retired = manager.allocate(None);
        manager.return_page(&mut retired);
        let kept = manager.allocate(None);
        manager.allocate(None);

        // Fifth allocation crosses the bound and sweeps.
        manager.allocate(None);
        let stats = manager.stats();
        assert_eq!(stats.sweeps, 1);
        assert!(full.resolve().is_none());
        assert!(kept.resolve().is_some());
        assert_eq!(stats.forced_evictions, 0);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.active + stats.deleted, stats.created);
        assert_eq!(manager.live_handles(), 3);
    }

    #[test]
    fn hard_bound_evicts_oldest_half() {
        let manager = manager(1024, 4);
        let handles: Vec<PageHandle> = (0..5).map(|_| manager.allocate(None)).collect();

        let stats = manager.stats();
        assert_eq!(stats.sweeps, 1);
        assert!(stats.active <= 4);
        assert_eq!(stats.forced_evictions, 3);
        // Ids above created - bound/2 survive.
        assert!(handles[2].resolve().is_none());
        assert!(handles[3].resolve().is_some());
        assert!(handles[4].resolve().is_some());
    }

    #[test]
    fn bytes_concatenates_in_id_order() {
        let manager = manager(1024, 16);
        let a = manager.allocate(None);
        let b = manager.allocate(None);
        b.resolve()
            .unwrap()
            .append("{b}", Level::Info, "second", None, false);
        a.resolve()
            .unwrap()
            .append("{a}", Level::Info, "first", None, false);

        let records = manager.records().unwrap();
        let data: Vec<&str> = records.iter().map(|r| r.data.as_str()).collect();
        assert_eq!(data, vec!["first", "second"]);
    }

    #[test]
    fn bytes_skips_reclaimed_pages() {
        let manager = manager(1024, 16);
        let a = manager.allocate(None);
        a.resolve()
            .unwrap()
            .append("{a}", Level::Info, "gone", None, false);
        manager.purge();
        assert!(manager.bytes().is_empty());
        assert_eq!(manager.live_handles(), 0);
        let stats = manager.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.deleted, 1);
    }

    #[test]
    fn spare_pages_are_reused() {
        let manager = manager(1024, 16);
        let a = manager.allocate(None);
        a.resolve()
            .unwrap()
            .append("{a}", Level::Info, "old", None, false);
        manager.release(&a);
        assert_eq!(manager.arena.spare_count(), 1);

        let b = manager.allocate(None);
        assert_eq!(manager.arena.spare_count(), 0);
        let page = b.resolve().unwrap();
        assert_eq!(page.id(), 2);
        assert!(page.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn allocation_keeps_bound_and_accounting(
            max_pages in 2u64..12,
            ops in proptest::collection::vec(0u8..4, 1..200),
        ) {
            let manager = manager(64, max_pages);
            let mut held: Vec<PageHandle> = Vec::new();

            for op in ops {
                match op {
                    0 => held.push(manager.allocate(None)),
                    1 => {
                        let previous = held.last().cloned();
                        held.push(manager.allocate(previous));
                    }
                    2 => {
                        if let Some(mut handle) = held.pop() {
                            manager.return_page(&mut handle);
                        }
                    }
                    _ => {
                        if let Some(handle) = held.last() {
                            if let Some(mut page) = handle.resolve() {
                                if !page.is_full() {
                                    page.append("{prop}", Level::Info, "payload", None, false);
                                }
                            }
                        }
                    }
                }
                let stats = manager.stats();
                proptest::prop_assert_eq!(stats.active + stats.deleted, stats.created);
                if op < 2 {
                    proptest::prop_assert!(stats.active <= max_pages);
                }
            }
        }
    }

    #[test]
    fn level_and_sink_defaults() {
        let manager = Manager::with_defaults();
        assert_eq!(manager.level(), Level::Info);
        manager.set_level(Level::Trace);
        assert_eq!(manager.level(), Level::Trace);
        assert!(manager.legacy_sink().is_none());
        manager.set_legacy_sink(Some(Arc::new(crate::legacy::TracingSink)));
        assert!(manager.legacy_sink().is_some());
    }
}
