//! # pagelog Testkit
//!
//! Test utilities for pagelog.
//!
//! This crate provides:
//! - Test fixtures: contexts, managers, nested error chains
//! - Property-based test generators using proptest
//! - Golden test utilities for the record format
//! - Cross-crate integration helpers and rotation scenarios
//! - Stress testing utilities for concurrent rotators
//!
//! ## Usage
//!
//! ```
//! use pagelog_testkit::prelude::*;
//!
//! let test = TestManager::with_capacity(64);
//! let mut log = test.rotator("orders");
//! log.error_with(&"charge failed", &ChainError::nested(3));
//! log.flush();
//!
//! let records = test.records().unwrap();
//! assert_eq!(records[0].cause_count(), 3);
//! test.assert_accounting();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use integration::*;
pub use stress::*;
