//! Fixed-capacity record pages.

use crate::cause;
use crate::handle::PageHandle;
use crate::level::Level;
use pagelog_codec::{encode_record, CanonicalEncoder, RecordRef};
use std::error::Error;

/// A fixed-capacity buffer of encoded records.
///
/// A page is written by one rotator at a time and does no locking of its
/// own; shared access goes through [`PageHandle::resolve`]. Once the encoded
/// length reaches the capacity the page is full and accepts nothing more
/// until [`reset`](Self::reset).
#[derive(Debug)]
pub struct Page {
    id: u64,
    capacity: usize,
    encoder: CanonicalEncoder,
    full: bool,
    previous: Option<PageHandle>,
}

impl Page {
    pub(crate) fn new(id: u64, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            encoder: CanonicalEncoder::with_capacity(capacity),
            full: false,
            previous: None,
        }
    }

    /// Reuse a reset page under a new id.
    pub(crate) fn reassign(mut self, id: u64, capacity: usize) -> Self {
        self.reset();
        self.id = id;
        self.capacity = capacity;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_text_limit(id: u64, capacity: usize, limit: u64) -> Self {
        Self {
            encoder: CanonicalEncoder::with_capacity(capacity).with_text_limit(limit),
            ..Self::new(id, capacity)
        }
    }

    /// Page id. Ids are assigned in allocation order.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Byte capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Whether the page has stopped accepting records.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Encoded records written so far.
    pub fn bytes(&self) -> &[u8] {
        self.encoder.as_bytes()
    }

    /// The page this one replaced, if it is still chained.
    pub fn previous(&self) -> Option<&PageHandle> {
        self.previous.as_ref()
    }

    pub(crate) fn set_previous(&mut self, previous: Option<PageHandle>) {
        self.previous = previous;
    }

    pub(crate) fn take_previous(&mut self) -> Option<PageHandle> {
        self.previous.take()
    }

    /// Encode one record.
    ///
    /// With a `cause`, its chain is rendered into `causeMessages` and, if
    /// `dump_stack` is set, a stack field is added. Returns the number of
    /// bytes written, or `None` if encoding failed. A failed write retires
    /// the page and the record is lost.
    ///
    /// # Panics
    ///
    /// Panics if the page is already full. Rotators check
    /// [`is_full`](Self::is_full) first, so reaching this is a bug in the
    /// caller's rotation.
    pub fn append(
        &mut self,
        name: &str,
        level: Level,
        data: &str,
        cause: Option<&(dyn Error + 'static)>,
        dump_stack: bool,
    ) -> Option<usize> {
        assert!(!self.full, "append to full page {}", self.id);

        let cause_messages = cause.map(cause::cause_messages);
        let stack_trace = match cause {
            Some(_) if dump_stack => Some(cause::stack_trace()),
            _ => None,
        };
        let record = RecordRef {
            name,
            level: level.as_numeric(),
            data,
            cause_messages: cause_messages.as_deref(),
            stack_trace: stack_trace.as_deref(),
        };

        let start = self.encoder.len();
        match encode_record(&mut self.encoder, &record) {
            Ok(()) => {
                if self.encoder.len() >= self.capacity {
                    self.full = true;
                }
                Some(self.encoder.len() - start)
            }
            Err(error) => {
                tracing::debug!(page = self.id, %error, "record encoding failed, retiring page");
                self.full = true;
                None
            }
        }
    }

    /// Clear contents and fullness, keeping the allocation.
    pub fn reset(&mut self) {
        self.encoder.clear();
        self.full = false;
        self.previous = None;
    }
}
