//! `databank` library crate.
//!
//! Retrieves UK macroeconomic series from the ONS, the Bank of England and HM Land
//! Registry, harmonizes them onto a common monthly, quarterly or annual calendar,
//! and joins them into aligned tables. The binary (`databank`) is a thin wrapper
//! around this library.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod harmonize;
pub mod indicators;
pub mod io;
pub mod math;
pub mod registry;
pub mod report;
pub mod table;
