//! Frequency harmonization.
//!
//! Responsibilities:
//!
//! - infer the native cadence of a series (`detect`)
//! - build period-end calendar grids (`grid`)
//! - resample or interpolate onto a target cadence (`harmonizer`)

pub mod detect;
pub mod grid;
pub mod harmonizer;

pub use detect::*;
pub use grid::*;
pub use harmonizer::*;
