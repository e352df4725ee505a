//! Reclaimable page handles and the slot arena behind them.
//!
//! A page lives in an arena slot stamped with a generation. A handle
//! remembers the page id, the slot and the generation it was issued for.
//! Releasing a slot takes the page out and bumps the generation, so every
//! outstanding handle to it stops resolving while keeping its id.
//!
//! A handle moves through three states:
//!
//! | state | resolves | meaning |
//! |---|---|---|
//! | Live | yes | a rotator is writing to the page |
//! | Retired | yes, through tracked copies | the writer is done; bytes stay exportable |
//! | Reclaimed | no | the page has been released |

use crate::page::Page;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    page: Option<Page>,
    retired: bool,
}

/// One arena cell. Shared between the arena's free list and handles.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    state: Mutex<SlotState>,
}

/// Reference to a page that may be reclaimed at any time.
///
/// Resolution failing is a normal outcome. The id survives reclamation,
/// and handles compare and order by id, so ascending order is oldest first.
/// The null handle has id 0 and never resolves.
#[derive(Clone, Default)]
pub struct PageHandle {
    id: u64,
    slot: Option<Arc<Slot>>,
    generation: u64,
}

impl PageHandle {
    /// The null handle.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            id: 0,
            slot: None,
            generation: 0,
        }
    }

    /// Id of the page this handle was issued for.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this is the null handle.
    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Lock and return the page, or `None` if it has been reclaimed or this
    /// handle was cleared.
    ///
    /// The guard holds the slot lock; keep it short.
    pub fn resolve(&self) -> Option<MappedMutexGuard<'_, Page>> {
        let slot = self.slot.as_ref()?;
        let generation = self.generation;
        MutexGuard::try_map(slot.state.lock(), |state| {
            if state.generation == generation {
                state.page.as_mut()
            } else {
                None
            }
        })
        .ok()
    }

    /// Whether the page is still present.
    pub fn is_resolvable(&self) -> bool {
        self.resolve().is_some()
    }

    /// Drop this copy's relation to the page and retire the page.
    ///
    /// Returns `true` if this moved the page out of the live state. Other
    /// copies of the handle keep resolving until the page is released.
    pub(crate) fn clear(&mut self) -> bool {
        let Some(slot) = self.slot.take() else {
            return false;
        };
        let mut state = slot.state.lock();
        if state.generation != self.generation || state.page.is_none() || state.retired {
            return false;
        }
        state.retired = true;
        true
    }

    /// Whether a sweep may drop this handle: reclaimed, retired or full.
    pub(crate) fn is_sweepable(&self) -> bool {
        let Some(slot) = self.slot.as_ref() else {
            return true;
        };
        let state = slot.state.lock();
        if state.generation != self.generation || state.retired {
            return true;
        }
        state.page.as_ref().map_or(true, Page::is_full)
    }
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("attached", &self.slot.is_some())
            .finish()
    }
}

impl PartialEq for PageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PageHandle {}

impl PartialOrd for PageHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PageHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for PageHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// What a release found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// The page was still live; the caller owes a deletion count.
    WasLive,
    /// The page had been retired and was already counted.
    WasRetired,
    /// The handle no longer referred to a page.
    Stale,
}

/// Slot storage with a free list and a pool of reset pages.
#[derive(Debug)]
pub(crate) struct PageArena {
    free: Mutex<Vec<Arc<Slot>>>,
    spares: Mutex<Vec<Page>>,
    spare_limit: usize,
}

impl PageArena {
    pub(crate) fn new(spare_limit: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            spares: Mutex::new(Vec::with_capacity(spare_limit)),
            spare_limit,
        }
    }

    /// A reset page from the pool, if any.
    pub(crate) fn take_spare(&self) -> Option<Page> {
        self.spares.lock().pop()
    }

    #[cfg(test)]
    pub(crate) fn spare_count(&self) -> usize {
        self.spares.lock().len()
    }

    pub(crate) fn clear_spares(&self) {
        self.spares.lock().clear();
    }

    /// Place `page` in a slot and issue a live handle for it.
    pub(crate) fn insert(&self, page: Page) -> PageHandle {
        let slot = self.free.lock().pop().unwrap_or_default();
        let id = page.id();
        let generation = {
            let mut state = slot.state.lock();
            state.page = Some(page);
            state.retired = false;
            state.generation
        };
        PageHandle {
            id,
            slot: Some(slot),
            generation,
        }
    }

    /// Reclaim the page behind `handle`.
    ///
    /// Idempotent: once a slot's generation has moved on, further releases
    /// through any copy of the handle are [`Release::Stale`].
    pub(crate) fn release(&self, handle: &PageHandle) -> Release {
        let Some(slot) = handle.slot.as_ref() else {
            return Release::Stale;
        };
        let (page, retired) = {
            let mut state = slot.state.lock();
            if state.generation != handle.generation {
                return Release::Stale;
            }
            let Some(page) = state.page.take() else {
                return Release::Stale;
            };
            state.generation += 1;
            (page, std::mem::take(&mut state.retired))
        };
        self.free.lock().push(Arc::clone(slot));
        self.recycle(page);
        if retired {
            Release::WasRetired
        } else {
            Release::WasLive
        }
    }

    fn recycle(&self, mut page: Page) {
        page.reset();
        let mut spares = self.spares.lock();
        if spares.len() < self.spare_limit {
            spares.push(page);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn live(arena: &PageArena, id: u64) -> PageHandle {
        arena.insert(Page::new(id, 64))
    }

    #[test]
    fn null_handle_never_resolves() {
        let handle = PageHandle::null();
        assert!(handle.is_null());
        assert_eq!(handle.id(), 0);
        assert!(handle.resolve().is_none());
        assert!(handle.is_sweepable());
    }

    #[test]
    fn resolve_live_page() {
        let arena = PageArena::new(4);
        let handle = live(&arena, 5);
        assert_eq!(handle.id(), 5);
        assert_eq!(handle.resolve().unwrap().id(), 5);
        assert!(!handle.is_sweepable());
    }

    #[test]
    fn release_keeps_id_and_stops_resolution() {
        let arena = PageArena::new(4);
        let handle = live(&arena, 5);
        let copy = handle.clone();

        assert_eq!(arena.release(&handle), Release::WasLive);
        assert!(handle.resolve().is_none());
        assert!(copy.resolve().is_none());
        assert_eq!(copy.id(), 5);
        assert_eq!(arena.release(&copy), Release::Stale);
    }

    #[test]
    fn clear_retires_once() {
        let arena = PageArena::new(4);
        let mut writer = live(&arena, 1);
        let tracked = writer.clone();

        assert!(writer.clear());
        assert!(writer.resolve().is_none());
        assert_eq!(writer.id(), 1);
        assert!(!writer.clear());

        // The tracked copy still exports the bytes until release.
        assert!(tracked.is_resolvable());
        assert!(tracked.is_sweepable());
        assert_eq!(arena.release(&tracked), Release::WasRetired);
    }

    #[test]
    fn clear_after_release_is_not_a_deletion() {
        let arena = PageArena::new(4);
        let mut writer = live(&arena, 1);
        arena.release(&writer.clone());
        assert!(!writer.clear());
    }

    #[test]
    fn slots_are_reused_with_new_generation() {
        let arena = PageArena::new(4);
        let old = live(&arena, 1);
        arena.release(&old);

        let new = live(&arena, 2);
        assert!(old.resolve().is_none());
        assert_eq!(new.resolve().unwrap().id(), 2);
    }

    #[test]
    fn released_pages_are_recycled() {
        let arena = PageArena::new(1);
        let a = live(&arena, 1);
        let b = live(&arena, 2);
        a.resolve()
            .unwrap()
            .append("{svc}", Level::Info, "payload", None, false);

        arena.release(&a);
        arena.release(&b);
        assert_eq!(arena.spare_count(), 1);

        let spare = arena.take_spare().unwrap();
        assert!(spare.is_empty());
        assert!(arena.take_spare().is_none());
    }

    #[test]
    fn full_page_is_sweepable() {
        let arena = PageArena::new(0);
        let handle = arena.insert(Page::new(1, 4));
        handle
            .resolve()
            .unwrap()
            .append("{svc}", Level::Info, "overflow", None, false);
        assert!(handle.is_sweepable());
    }

    #[test]
    fn ordering_by_id() {
        let arena = PageArena::new(0);
        let mut handles = vec![live(&arena, 3), live(&arena, 1), PageHandle::null()];
        handles.sort();
        let ids: Vec<u64> = handles.iter().map(PageHandle::id).collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }
}
