//! Source registry and retrieval facade.
//!
//! A `Registry` maps source names to ingestor constructors, owns the transport,
//! and keeps a log of every series it has retrieved. `retrieve` runs one batch:
//! construct, fetch, harmonize, log, then outer-join the results.

use std::collections::HashMap;
use std::fmt;

use log::info;

use crate::config::SourceConfig;
use crate::data::{BOE, BoeIngestor, HMLR, HmlrIngestor, Ingestor, ONS, OnsIngestor, Transport};
use crate::domain::{Cadence, SeriesRequest};
use crate::error::DataError;
use crate::harmonize::harmonize;
use crate::table::AlignedTable;

/// Builds an ingestor for one request, rejecting requests it cannot serve.
pub type IngestorConstructor = Box<dyn Fn(&SeriesRequest) -> Result<Box<dyn Ingestor>, DataError>>;

/// One retrieved series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub source: String,
    /// `Ingestor::describe` of the ingestor that fetched the series.
    pub descriptor: String,
    pub cadence: Cadence,
    pub interpolated: bool,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / Date Frequency: {} / Interpolation: {}",
            self.descriptor, self.cadence, self.interpolated
        )
    }
}

pub struct Registry {
    transport: Box<dyn Transport>,
    sources: HashMap<String, IngestorConstructor>,
    log: Vec<LogEntry>,
}

impl Registry {
    /// An empty registry; sources are added with `register`.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            sources: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// A registry with the three public sources registered under `ONS`, `BOE`, `HMLR`.
    pub fn with_builtin_sources(transport: Box<dyn Transport>, config: &SourceConfig) -> Self {
        let mut registry = Self::new(transport);

        let ons_url = config.ons_url.clone();
        registry.register(ONS, move |request| {
            Ok(Box::new(OnsIngestor::from_request(request, &ons_url)?) as Box<dyn Ingestor>)
        });

        let boe_url = config.boe_url.clone();
        registry.register(BOE, move |request| {
            Ok(Box::new(BoeIngestor::from_request(request, &boe_url)?) as Box<dyn Ingestor>)
        });

        let hmlr_url = config.hmlr_url.clone();
        registry.register(HMLR, move |request| {
            Ok(Box::new(HmlrIngestor::from_request(request, &hmlr_url)?) as Box<dyn Ingestor>)
        });

        registry
    }

    /// Map `name` (case-insensitive) to `constructor`, replacing any earlier mapping.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&SeriesRequest) -> Result<Box<dyn Ingestor>, DataError> + 'static,
    {
        self.sources.insert(name.to_ascii_uppercase(), Box::new(constructor));
    }

    /// Registered source names, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fetch every request from `source`, harmonize each onto `cadence_code`, and
    /// outer-join them into one table. The first failure aborts the batch.
    pub fn retrieve(
        &mut self,
        source: &str,
        requests: &[SeriesRequest],
        cadence_code: &str,
    ) -> Result<AlignedTable, DataError> {
        let cadence = Cadence::from_code(cadence_code)?;
        let key = source.to_ascii_uppercase();
        let constructor = self
            .sources
            .get(&key)
            .ok_or_else(|| DataError::UnknownSource(source.to_string()))?;

        info!("retrieving {} series from {key} at {} cadence", requests.len(), cadence.display_name());

        let mut harmonized = Vec::with_capacity(requests.len());
        for request in requests {
            let ingestor = constructor(request)?;
            let raw = ingestor.fetch(self.transport.as_ref(), cadence)?;
            let series = harmonize(&raw, cadence)?;
            info!(
                "{request}: {} rows from {} to {} (interpolated: {})",
                series.len(),
                series.observations().first().map(|o| o.date.to_string()).unwrap_or_default(),
                series.last().map(|o| o.date.to_string()).unwrap_or_default(),
                series.interpolated()
            );

            self.log.push(LogEntry {
                source: key.clone(),
                descriptor: ingestor.describe(),
                cadence,
                interpolated: series.interpolated(),
            });
            harmonized.push(series);
        }

        AlignedTable::from_series(cadence, &harmonized)
    }

    pub fn call_log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn reset_log(&mut self) {
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::{RawResponse, StaticTransport};

    const BOE_URL: &str = "https://boe.test/iadb";
    const ONS_BASE: &str = "https://ons.test/timeseries";

    fn test_config() -> SourceConfig {
        SourceConfig {
            ons_url: ONS_BASE.to_string(),
            boe_url: BOE_URL.to_string(),
            hmlr_url: "https://hmlr.test/query".to_string(),
            timeout_secs: 5,
        }
    }

    fn monthly_csv(code: &str, year: i32, months: std::ops::RangeInclusive<u32>, base: f64) -> String {
        let mut body = format!("DATE,{code}\n");
        for m in months {
            let first = NaiveDate::from_ymd_opt(year, m, 1).unwrap();
            body.push_str(&format!("{},{}\n", first.format("%d %b %Y"), base + f64::from(m)));
        }
        body
    }

    fn two_series_transport() -> Rc<StaticTransport> {
        Rc::new(
            StaticTransport::new()
                .route_with_param(BOE_URL, "SeriesCodes", "AAA", RawResponse::ok(monthly_csv("AAA", 2020, 1..=12, 0.0)))
                .route_with_param(BOE_URL, "SeriesCodes", "BBB", RawResponse::ok(monthly_csv("BBB", 2020, 1..=12, 100.0))),
        )
    }

    #[test]
    fn retrieve_joins_series_and_logs_each_call() {
        let transport = two_series_transport();
        let mut registry = Registry::new(Box::new(Rc::clone(&transport)));
        registry.register("SRC", |request| {
            Ok(Box::new(BoeIngestor::from_request(request, BOE_URL)?) as Box<dyn Ingestor>)
        });

        let requests = [SeriesRequest::boe("AAA"), SeriesRequest::boe("BBB")];
        let table = registry.retrieve("SRC", &requests, "m").unwrap();

        assert_eq!(table.column_names(), vec!["AAA", "BBB"]);
        assert_eq!(table.n_rows(), 12);
        assert_eq!(table.column("BBB").unwrap()[0], Some(101.0));
        assert_eq!(transport.requests().len(), 2);

        let log = registry.call_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].source, "SRC");
        assert_eq!(
            log[1].to_string(),
            "BOE / Series Code: BBB / Date Frequency: m / Interpolation: false"
        );

        registry.reset_log();
        assert!(registry.call_log().is_empty());
    }

    #[test]
    fn invalid_cadence_fails_before_any_request() {
        let transport = two_series_transport();
        let mut registry = Registry::with_builtin_sources(Box::new(Rc::clone(&transport)), &test_config());

        let err = registry.retrieve("BOE", &[SeriesRequest::boe("AAA")], "w").unwrap_err();
        assert!(matches!(err, DataError::InvalidCadence(code) if code == "w"));
        assert!(transport.requests().is_empty());
        assert!(registry.call_log().is_empty());
    }

    #[test]
    fn unknown_source_and_mismatched_requests() {
        let mut registry = Registry::with_builtin_sources(Box::new(StaticTransport::new()), &test_config());
        assert_eq!(registry.sources(), vec!["BOE", "HMLR", "ONS"]);

        assert!(matches!(
            registry.retrieve("FRED", &[SeriesRequest::boe("AAA")], "m"),
            Err(DataError::UnknownSource(_))
        ));
        assert!(matches!(
            registry.retrieve("ons", &[SeriesRequest::boe("AAA")], "m"),
            Err(DataError::RequestMismatch { .. })
        ));
    }

    #[test]
    fn first_failure_aborts_the_batch() {
        let transport = two_series_transport();
        let mut registry = Registry::with_builtin_sources(Box::new(Rc::clone(&transport)), &test_config());

        let requests = [SeriesRequest::boe("AAA"), SeriesRequest::boe("MISSING"), SeriesRequest::boe("BBB")];
        let err = registry.retrieve("BOE", &requests, "q").unwrap_err();
        assert!(matches!(err, DataError::Retrieval(_)));
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(registry.call_log().len(), 1);
    }

    #[test]
    fn ons_fallback_is_logged_as_interpolated() {
        let body = r#"{"months": [], "quarters": [
            {"date": "2020 Q1", "value": "4.0"},
            {"date": "2020 Q2", "value": "4.2"},
            {"date": "2020 Q3", "value": "4.8"},
            {"date": "2020 Q4", "value": "5.1"}
        ]}"#;
        let transport = StaticTransport::new().route(&format!("{ONS_BASE}/MGSX/dataset/LMS/data"), RawResponse::ok(body));
        let mut registry = Registry::with_builtin_sources(Box::new(transport), &test_config());

        let table = registry.retrieve("ONS", &[SeriesRequest::ons("LMS", "MGSX")], "m").unwrap();
        // Mar..Dec at monthly cadence.
        assert_eq!(table.n_rows(), 10);
        assert!(table.column("MGSX").unwrap().iter().all(Option::is_some));
        assert_eq!(
            registry.call_log()[0].to_string(),
            "ONS / Dataset ID: LMS / Timeseries ID: MGSX / Date Frequency: m / Interpolation: true"
        );
    }

    #[test]
    fn register_replaces_existing_mapping() {
        let mut registry = Registry::with_builtin_sources(Box::new(StaticTransport::new()), &test_config());
        registry.register("boe", |_| Err(DataError::InvalidRequest("disabled".to_string())));
        assert_eq!(registry.sources().len(), 3);
        assert!(matches!(
            registry.retrieve("BOE", &[SeriesRequest::boe("AAA")], "m"),
            Err(DataError::InvalidRequest(_))
        ));
    }
}
