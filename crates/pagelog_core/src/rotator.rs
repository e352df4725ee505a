//! Per-stream page rotation.

use crate::context::{self, LogContext};
use crate::handle::PageHandle;
use crate::legacy::LegacySink;
use crate::level::Level;
use crate::manager::Manager;
use std::error::Error;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Lifecycle of a rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatorState {
    /// No page held. The next emitted record allocates one.
    Uninitialized,
    /// Holding a page.
    Active,
}

/// The logger of one stream.
///
/// A rotator holds at most one page. It writes records into that page,
/// swaps it for a fresh one when it fills up, and gives it back on
/// [`flush`](Self::flush). Logging never fails: filtered calls, missing
/// payloads, reclaimed pages and encoding errors all end in fewer records,
/// never in an error or a panic.
///
/// Methods take `&mut self`; use one rotator per thread.
///
/// Dropping a rotator does not flush it. Call `flush` on every exit path;
/// an unflushed page stays live until an eviction sweep collects it.
pub struct Rotator {
    manager: Arc<Manager>,
    context: Arc<dyn LogContext>,
    current: Option<PageHandle>,
    level: Level,
    dump_stack: bool,
    legacy: Option<Arc<dyn LegacySink>>,
}

macro_rules! level_methods {
    ($($level:ident => $log:ident, $log_with:ident, $is:ident;)*) => {
        $(
            #[doc = concat!("Log `data` at ", stringify!($level), ".")]
            pub fn $log(&mut self, data: &dyn Display) {
                self.log(Level::$level, Some(data), None);
            }

            #[doc = concat!("Log `data` and its cause at ", stringify!($level), ".")]
            pub fn $log_with(&mut self, data: &dyn Display, cause: &(dyn Error + 'static)) {
                self.log(Level::$level, Some(data), Some(cause));
            }

            #[doc = concat!("Whether ", stringify!($level), " records are emitted.")]
            pub fn $is(&self) -> bool {
                self.is_enabled(Level::$level)
            }
        )*
    };
}

impl Rotator {
    /// Create a rotator. Prefer [`Manager::rotator`].
    pub fn new(
        manager: Arc<Manager>,
        context: Arc<dyn LogContext>,
        level: Level,
        dump_stack: bool,
        legacy: Option<Arc<dyn LegacySink>>,
    ) -> Self {
        Self {
            manager,
            context,
            current: None,
            level,
            dump_stack,
            legacy,
        }
    }

    level_methods! {
        Fatal => fatal, fatal_with, is_fatal;
        Error => error, error_with, is_error;
        Warn => warn, warn_with, is_warn;
        Info => info, info_with, is_info;
        Debug => debug, debug_with, is_debug;
        Trace => trace, trace_with, is_trace;
    }

    /// Log one record.
    ///
    /// Calls above the stream threshold and calls without `data` do
    /// nothing. Otherwise the record goes to the legacy sink, if any, and
    /// then into the current page.
    pub fn log(
        &mut self,
        level: Level,
        data: Option<&dyn Display>,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let Some(data) = data else {
            return;
        };
        let data = context::render(data);

        if let Some(sink) = &self.legacy {
            let message = format!("{} {}", self.context.serial(), data);
            sink.forward(&message, cause);
        }
        self.write(level, &data, cause);
    }

    fn write(&mut self, level: Level, data: &str, cause: Option<&(dyn Error + 'static)>) {
        let mut handle = match self.current.take() {
            Some(handle) => handle,
            None => self.manager.allocate(None),
        };

        let full = match handle.resolve() {
            Some(page) => page.is_full(),
            None => {
                // Reclaimed under us. Drop this record; the next call
                // starts over with a fresh page.
                self.manager.record_drop();
                tracing::trace!(
                    page = handle.id(),
                    stream = self.context.name(),
                    "page reclaimed, record dropped"
                );
                return;
            }
        };

        if full {
            let previous = handle.clone();
            self.manager.return_page(&mut handle);
            handle = self.manager.allocate(Some(previous));
            tracing::trace!(
                page = handle.id(),
                stream = self.context.name(),
                "page rotated"
            );
        }

        let written = handle.resolve().and_then(|mut page| {
            page.append(self.context.serial(), level, data, cause, self.dump_stack)
        });
        match written {
            Some(bytes) => self.manager.record_write(bytes),
            None => self.manager.record_drop(),
        }
        self.current = Some(handle);
    }

    /// Give the current page back to the manager.
    ///
    /// Records already written stay exportable. Safe to call repeatedly.
    pub fn flush(&mut self) {
        if let Some(mut handle) = self.current.take() {
            self.manager.return_page(&mut handle);
        }
    }

    /// Whether records at `level` are emitted.
    pub fn is_enabled(&self, level: Level) -> bool {
        level.is_enabled_at(self.level)
    }

    /// Stream threshold.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Change the stream threshold.
    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Whether a page is held.
    pub fn state(&self) -> RotatorState {
        if self.current.is_some() {
            RotatorState::Active
        } else {
            RotatorState::Uninitialized
        }
    }

    /// Id of the held page.
    pub fn current_page_id(&self) -> Option<u64> {
        self.current.as_ref().map(PageHandle::id)
    }

    /// Stream identity.
    pub fn context(&self) -> &dyn LogContext {
        self.context.as_ref()
    }

    /// The manager this rotator allocates from.
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }
}

impl fmt::Debug for Rotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rotator")
            .field("stream", &self.context.name())
            .field("level", &self.level)
            .field("current", &self.current)
            .field("dump_stack", &self.dump_stack)
            .field("legacy", &self.legacy.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerConfig;
    use crate::context::{LogData, StaticContext, SERIALIZATION_FAILED};
    use parking_lot::Mutex;

    fn setup(capacity: usize) -> (Arc<Manager>, Rotator) {
        let manager = Manager::new(ManagerConfig::new().page_capacity(capacity)).unwrap();
        let rotator = manager.rotator(Arc::new(StaticContext::new("test")));
        (manager, rotator)
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl LegacySink for Collect {
        fn forward(&self, message: &str, _: Option<&(dyn Error + 'static)>) {
            self.0.lock().push(message.to_string());
        }
    }

    struct Broken;

    impl Display for Broken {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn first_call_allocates() {
        let (manager, mut log) = setup(1024);
        assert_eq!(log.state(), RotatorState::Uninitialized);
        log.info(&"hello");
        assert_eq!(log.state(), RotatorState::Active);
        assert_eq!(log.current_page_id(), Some(1));
        assert_eq!(manager.stats().created, 1);
    }

    #[test]
    fn filtered_calls_allocate_nothing() {
        let (manager, mut log) = setup(1024);
        log.debug(&"hidden");
        log.trace(&"hidden");
        assert_eq!(log.state(), RotatorState::Uninitialized);
        assert_eq!(manager.stats().created, 0);
        assert!(!log.is_debug());
        assert!(log.is_info());
        assert!(log.is_fatal());
    }

    #[test]
    fn missing_data_is_a_no_op() {
        let (manager, mut log) = setup(1024);
        log.log(Level::Error, None, None);
        assert_eq!(log.state(), RotatorState::Uninitialized);
        assert_eq!(manager.stats().records_written, 0);
    }

    #[test]
    fn rotates_when_full() {
        let (manager, mut log) = setup(10);
        log.info(&"first record");
        let first = log.current_page_id().unwrap();
        log.info(&"second record");
        let second = log.current_page_id().unwrap();
        assert!(second > first);

        let stats = manager.stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(manager.records().unwrap().len(), 2);
    }

    #[test]
    fn flush_is_idempotent() {
        let (manager, mut log) = setup(1024);
        log.warn(&"once");
        log.flush();
        log.flush();
        assert_eq!(log.state(), RotatorState::Uninitialized);
        let stats = manager.stats();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.active, 0);
        assert_eq!(manager.records().unwrap().len(), 1);
    }

    #[test]
    fn reclaimed_page_drops_one_record() {
        let (manager, mut log) = setup(1024);
        log.info(&"kept");
        manager.purge();

        log.info(&"dropped");
        assert_eq!(log.state(), RotatorState::Uninitialized);
        assert_eq!(manager.stats().records_dropped, 1);

        log.info(&"recovered");
        assert_eq!(log.state(), RotatorState::Active);
        let records = manager.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, "recovered");
    }

    #[test]
    fn legacy_sink_sees_emitted_records() {
        let manager = Manager::with_defaults();
        let sink = Arc::new(Collect::default());
        manager.set_legacy_sink(Some(sink.clone()));
        let mut log = manager.rotator(Arc::new(StaticContext::new("svc")));

        log.info(&LogData::new("Main").arg(&1));
        log.debug(&"filtered");

        assert_eq!(*sink.0.lock(), vec!["{svc} Main 1".to_string()]);
        assert_eq!(manager.records().unwrap().len(), 1);
    }

    #[test]
    fn failing_display_is_recorded_as_placeholder() {
        let (manager, mut log) = setup(1024);
        log.error(&Broken);
        let records = manager.records().unwrap();
        assert_eq!(records[0].data, SERIALIZATION_FAILED);
        assert_eq!(records[0].level, 2);
    }

    #[test]
    fn cause_is_recorded() {
        let (manager, mut log) = setup(4096);
        let err = std::io::Error::other("socket closed");
        log.fatal_with(&"shutdown", &err);

        let records = manager.records().unwrap();
        assert_eq!(records[0].level, 1);
        assert_eq!(records[0].cause_count(), 1);
        assert!(records[0].cause_messages.as_deref().unwrap().contains("socket closed"));
        assert!(records[0].stack_trace.is_some());
    }

    #[derive(Debug)]
    struct Unprintable;

    impl Display for Unprintable {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl Error for Unprintable {}

    struct Opaque;

    impl fmt::Debug for Opaque {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("opaque failure")
        }
    }

    impl Error for Opaque {}

    #[test]
    fn failing_cause_debug_is_recorded() {
        let (manager, mut log) = setup(4096);
        log.error_with(&"x", &Opaque);

        let records = manager.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].cause_messages.as_deref(),
            Some("[Error, opaque failure],")
        );
    }

    #[test]
    fn failing_cause_display_keeps_shape() {
        let (manager, mut log) = setup(4096);
        log.error_with(&"x", &Unprintable);

        let records = manager.records().unwrap();
        let expected = format!("[Unprintable, {SERIALIZATION_FAILED}],");
        assert_eq!(records[0].cause_messages.as_deref(), Some(expected.as_str()));
        assert_eq!(records[0].cause_count(), 1);
    }

    #[test]
    fn level_can_change() {
        let (manager, mut log) = setup(1024);
        log.set_level(Level::Trace);
        assert_eq!(log.level(), Level::Trace);
        log.trace(&"visible");
        assert_eq!(manager.stats().records_written, 1);
    }
}
