//! Manager configuration.

use crate::error::{CoreError, CoreResult};
use crate::level::Level;

/// Configuration for a [`Manager`](crate::Manager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Byte capacity of a page. A page reports full once its encoded
    /// length reaches this value.
    pub page_capacity: usize,

    /// Eviction bound: the number of live pages the manager tolerates
    /// before a sweep is forced.
    pub max_pages: u64,

    /// Length of the diagnostic `previous` chain kept behind a new page.
    pub max_chain_hops: usize,

    /// Threshold given to rotators created by the manager.
    pub default_level: Level,

    /// Whether records carrying a cause also carry a stack field.
    pub dump_stack: bool,

    /// How many reset pages are kept for reuse.
    pub spare_pages: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            page_capacity: 1024 * 1024, // 1 MiB
            max_pages: 64,
            max_chain_hops: 3,
            default_level: Level::Info,
            dump_stack: true,
            spare_pages: 8,
        }
    }
}

impl ManagerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page capacity in bytes.
    #[must_use]
    pub const fn page_capacity(mut self, bytes: usize) -> Self {
        self.page_capacity = bytes;
        self
    }

    /// Sets the eviction bound.
    #[must_use]
    pub const fn max_pages(mut self, pages: u64) -> Self {
        self.max_pages = pages;
        self
    }

    /// Sets the diagnostic chain length.
    #[must_use]
    pub const fn max_chain_hops(mut self, hops: usize) -> Self {
        self.max_chain_hops = hops;
        self
    }

    /// Sets the threshold for new rotators.
    #[must_use]
    pub const fn default_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Sets whether causes are accompanied by a stack field.
    #[must_use]
    pub const fn dump_stack(mut self, value: bool) -> Self {
        self.dump_stack = value;
        self
    }

    /// Sets the size of the spare page pool.
    #[must_use]
    pub const fn spare_pages(mut self, pages: usize) -> Self {
        self.spare_pages = pages;
        self
    }

    /// Checks that the configuration can drive a manager.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` for a zero page capacity, an
    /// eviction bound below 2, or a zero chain length.
    pub fn validate(&self) -> CoreResult<()> {
        if self.page_capacity == 0 {
            return Err(CoreError::invalid_config("page_capacity must be non-zero"));
        }
        if self.max_pages < 2 {
            return Err(CoreError::invalid_config(format!(
                "max_pages must be at least 2, got {}",
                self.max_pages
            )));
        }
        if self.max_chain_hops == 0 {
            return Err(CoreError::invalid_config("max_chain_hops must be non-zero"));
        }
        Ok(())
    }
}
