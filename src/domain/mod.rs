//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the reporting cadence (`Cadence`)
//! - source-produced series (`CanonicalSeries`) and grid-aligned series (`HarmonizedSeries`)
//! - per-source request descriptors (`SeriesRequest`)

pub mod types;

pub use types::*;
