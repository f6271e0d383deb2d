//! Terminal reports.
//!
//! Formatting lives here so the library modules stay free of presentation code.

pub mod format;

pub use format::*;
