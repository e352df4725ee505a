//! Benchmarks for pagelog.
//!
//! The benchmarks live under `benches/`; this library holds the payload
//! generators they share.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
