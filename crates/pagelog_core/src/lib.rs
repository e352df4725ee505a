//! # pagelog Core
//!
//! An in-process, allocation-bounded log buffer.
//!
//! This crate provides:
//! - [`Page`]: a fixed-capacity buffer of encoded records
//! - [`PageHandle`]: a reclaimable reference to a page that keeps its id
//! - [`Manager`]: page allocation, eviction sweeps, accounting and export
//! - [`Rotator`]: the per-stream logger that rotates pages as they fill
//!
//! Logging never returns an error. When a page is gone or a record cannot
//! be encoded, the record is dropped and counted.
//!
//! ```
//! use pagelog_core::{Level, LogData, Manager, StaticContext};
//! use std::sync::Arc;
//!
//! let manager = Manager::with_defaults();
//! let mut log = manager.rotator(Arc::new(StaticContext::new("email=123@example.com")));
//!
//! log.info(&LogData::new("Session").arg(&"opened"));
//! log.debug(&"below the default threshold");
//! log.flush();
//!
//! let records = manager.records().unwrap();
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].name, "{email=123@example.com}");
//! assert_eq!(records[0].level, Level::Info.as_numeric());
//! assert_eq!(records[0].data, "Session opened");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cause;
mod config;
mod context;
mod error;
mod handle;
mod legacy;
mod level;
mod manager;
mod page;
mod rotator;
mod stats;

pub use config::ManagerConfig;
pub use context::{LogContext, LogData, StaticContext, SERIALIZATION_FAILED};
pub use error::{CoreError, CoreResult};
pub use handle::PageHandle;
pub use legacy::{LegacySink, TracingSink};
pub use level::Level;
pub use manager::Manager;
pub use page::Page;
pub use rotator::{Rotator, RotatorState};
pub use stats::{ManagerStats, StatsSnapshot};

pub use pagelog_codec::LogRecord;
