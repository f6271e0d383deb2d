//! Input/output helpers.
//!
//! - aligned table export to CSV (`export`)

pub mod export;

pub use export::*;
