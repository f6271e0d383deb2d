//! Data sources.
//!
//! Each source is a thin ingestor: build the request, parse the response into a
//! `CanonicalSeries`. Cadence handling lives in `crate::harmonize`, not here.

pub mod boe;
pub mod hmlr;
pub mod ons;
pub mod transport;

pub use boe::BoeIngestor;
pub use hmlr::HmlrIngestor;
pub use ons::OnsIngestor;
#[cfg(test)]
pub use transport::StaticTransport;
pub use transport::{HttpTransport, RawResponse, Transport};

use crate::domain::{Cadence, CanonicalSeries};
use crate::error::DataError;

/// Statistics office source name.
pub const ONS: &str = "ONS";
/// Central bank source name.
pub const BOE: &str = "BOE";
/// Land registry source name.
pub const HMLR: &str = "HMLR";

/// One configured fetch against a data source.
pub trait Ingestor {
    /// Fetch and parse the series.
    ///
    /// `cadence` is the cadence the caller will harmonize to; sources that publish
    /// several cadences use it to pick one, others ignore it.
    fn fetch(&self, transport: &dyn Transport, cadence: Cadence) -> Result<CanonicalSeries, DataError>;

    /// Source and parameters, for the call log.
    fn describe(&self) -> String;
}
