//! Source endpoints and transport settings.
//!
//! Defaults point at the public APIs. Each value can be overridden from the
//! environment (a `.env` file is honoured), which is mainly useful for pointing
//! the client at a mirror or a local replay server.

use std::time::Duration;

use crate::error::DataError;

pub const DEFAULT_ONS_URL: &str = "https://api.ons.gov.uk/timeseries";
pub const DEFAULT_BOE_URL: &str = "https://www.bankofengland.co.uk/boeapps/iadb/fromshowcolumns.asp?csv.x=yes";
pub const DEFAULT_HMLR_URL: &str = "http://landregistry.data.gov.uk/landregistry/query";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Base of the statistics-office time series API.
    pub ons_url: String,
    /// Central-bank interactive database CSV endpoint.
    pub boe_url: String,
    /// Land-registry SPARQL endpoint.
    pub hmlr_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ons_url: DEFAULT_ONS_URL.to_string(),
            boe_url: DEFAULT_BOE_URL.to_string(),
            hmlr_url: DEFAULT_HMLR_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SourceConfig {
    /// Load overrides from `DATABANK_*` environment variables.
    pub fn from_env() -> Result<Self, DataError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DataError> {
        let mut config = Self::default();
        if let Some(url) = lookup("DATABANK_ONS_URL") {
            config.ons_url = url;
        }
        if let Some(url) = lookup("DATABANK_BOE_URL") {
            config.boe_url = url;
        }
        if let Some(url) = lookup("DATABANK_HMLR_URL") {
            config.hmlr_url = url;
        }
        if let Some(raw) = lookup("DATABANK_TIMEOUT_SECS") {
            config.timeout_secs = match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(DataError::Config(format!(
                        "DATABANK_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                    )));
                }
            };
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
