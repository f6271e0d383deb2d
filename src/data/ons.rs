//! Office for National Statistics time series API.
//!
//! `GET {base}/{timeseries}/dataset/{dataset}/data` returns one JSON document with
//! the series at every cadence it is published at:
//!
//! ```text
//! { "months":   [{ "date": "2020 JAN", "value": "4.0", ... }, ...],
//!   "quarters": [{ "date": "2020 Q1",  "value": "3.9", ... }, ...],
//!   "years":    [{ "date": "2020",     "value": "4.5", ... }, ...] }
//! ```
//!
//! A series that is not published at the requested cadence falls back one step
//! along `months → quarters → years`; the returned series declares the cadence it
//! was actually read at, so the harmonizer interpolates it onto the requested grid.

use log::info;
use serde::Deserialize;

use crate::data::Ingestor;
use crate::data::transport::Transport;
use crate::domain::{Cadence, CanonicalSeries, Observation, SeriesRequest};
use crate::error::DataError;
use crate::harmonize::grid::month_end;

const MONTHS: [&str; 12] = ["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];

#[derive(Debug, Clone)]
pub struct OnsIngestor {
    base_url: String,
    dataset_id: String,
    timeseries_id: String,
}

impl OnsIngestor {
    pub fn new(base_url: &str, dataset_id: &str, timeseries_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset_id: dataset_id.to_string(),
            timeseries_id: timeseries_id.to_string(),
        }
    }

    pub fn from_request(request: &SeriesRequest, base_url: &str) -> Result<Self, DataError> {
        match request {
            SeriesRequest::Ons {
                dataset_id,
                timeseries_id,
            } => Ok(Self::new(base_url, dataset_id, timeseries_id)),
            other => Err(DataError::RequestMismatch {
                source_name: crate::data::ONS.to_string(),
                request: other.to_string(),
            }),
        }
    }

    fn url(&self) -> String {
        format!("{}/{}/dataset/{}/data", self.base_url, self.timeseries_id, self.dataset_id)
    }
}

impl Ingestor for OnsIngestor {
    fn fetch(&self, transport: &dyn Transport, cadence: Cadence) -> Result<CanonicalSeries, DataError> {
        let what = format!("ONS {}/{}", self.dataset_id, self.timeseries_id);
        let body = transport.get(&self.url(), &[])?.into_body(&what)?;
        let doc: OnsDocument = serde_json::from_slice(&body)
            .map_err(|e| DataError::Retrieval(format!("{what}: malformed JSON: {e}")))?;
        parse_document(&doc, &self.timeseries_id, cadence)
    }

    fn describe(&self) -> String {
        format!(
            "ONS / Dataset ID: {} / Timeseries ID: {}",
            self.dataset_id, self.timeseries_id
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct OnsDocument {
    #[serde(default)]
    months: Vec<OnsEntry>,
    #[serde(default)]
    quarters: Vec<OnsEntry>,
    #[serde(default)]
    years: Vec<OnsEntry>,
}

impl OnsDocument {
    fn entries(&self, cadence: Cadence) -> &[OnsEntry] {
        match cadence {
            Cadence::Monthly => &self.months,
            Cadence::Quarterly => &self.quarters,
            Cadence::Annual => &self.years,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OnsEntry {
    date: String,
    #[serde(default)]
    value: String,
}

/// The next key along `months → quarters → years`.
fn fallback_cadence(cadence: Cadence) -> Option<Cadence> {
    match cadence {
        Cadence::Monthly => Some(Cadence::Quarterly),
        Cadence::Quarterly => Some(Cadence::Annual),
        Cadence::Annual => None,
    }
}

fn parse_document(doc: &OnsDocument, name: &str, requested: Cadence) -> Result<CanonicalSeries, DataError> {
    let cadence = if !doc.entries(requested).is_empty() {
        requested
    } else {
        let fallback = fallback_cadence(requested)
            .filter(|c| !doc.entries(*c).is_empty())
            .ok_or_else(|| DataError::CadenceUnavailable {
                series: name.to_string(),
                requested: requested.ons_key().to_string(),
            })?;
        info!(
            "{name}: no {} published, using {} and interpolating",
            requested.ons_key(),
            fallback.ons_key()
        );
        fallback
    };

    let observations = doc
        .entries(cadence)
        .iter()
        .map(|entry| {
            let date = parse_period_end(&entry.date, cadence)?;
            let value = parse_value(&entry.value)
                .map_err(|_| DataError::Retrieval(format!("{name}: invalid value '{}' at {}", entry.value, entry.date)))?;
            Ok(Observation::new(date, value))
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    Ok(CanonicalSeries::new(name, observations).with_declared_cadence(cadence))
}

fn parse_value(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<f64>().map(Some)
}

/// Map `"2020 JAN"`, `"2020 Q1"` or `"2020"` to the last day of that period.
fn parse_period_end(raw: &str, cadence: Cadence) -> Result<chrono::NaiveDate, DataError> {
    let malformed = || DataError::Retrieval(format!("malformed ONS {} date '{raw}'", cadence.display_name()));
    let mut parts = raw.split_whitespace();
    let year: i32 = parts.next().and_then(|y| y.parse().ok()).ok_or_else(malformed)?;
    let tag = parts.next();
    if parts.next().is_some() {
        return Err(malformed());
    }

    let month0: i64 = match (cadence, tag) {
        (Cadence::Annual, None) => 11,
        (Cadence::Quarterly, Some(q)) => {
            let quarter: i64 = q
                .strip_prefix(['Q', 'q'])
                .and_then(|n| n.parse().ok())
                .filter(|n| (1..=4).contains(n))
                .ok_or_else(malformed)?;
            quarter * 3 - 1
        }
        (Cadence::Monthly, Some(m)) => {
            let abbrev = m.get(..3).ok_or_else(malformed)?.to_ascii_uppercase();
            MONTHS.iter().position(|name| *name == abbrev).ok_or_else(malformed)? as i64
        }
        _ => return Err(malformed()),
    };

    month_end(i64::from(year) * 12 + month0).map_err(|_| malformed())
}
