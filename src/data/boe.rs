//! Bank of England interactive statistical database (IADB) CSV endpoint.
//!
//! The response is a two-column CSV (`DATE,<series code>`) with dates such as
//! `02 Jan 1975`. The source does not say what cadence the series is reported at;
//! that is left to detection.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::data::Ingestor;
use crate::data::transport::Transport;
use crate::domain::{Cadence, CanonicalSeries, Observation, SeriesRequest};
use crate::error::DataError;

#[derive(Debug, Clone)]
pub struct BoeIngestor {
    endpoint: String,
    series_code: String,
}

impl BoeIngestor {
    pub fn new(endpoint: &str, series_code: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            series_code: series_code.to_string(),
        }
    }

    pub fn from_request(request: &SeriesRequest, endpoint: &str) -> Result<Self, DataError> {
        match request {
            SeriesRequest::Boe { series_code } => Ok(Self::new(endpoint, series_code)),
            other => Err(DataError::RequestMismatch {
                source_name: crate::data::BOE.to_string(),
                request: other.to_string(),
            }),
        }
    }
}

impl Ingestor for BoeIngestor {
    fn fetch(&self, transport: &dyn Transport, _cadence: Cadence) -> Result<CanonicalSeries, DataError> {
        let what = format!("BOE {}", self.series_code);
        let query = [
            ("DAT", "ALL"),
            ("SeriesCodes", self.series_code.as_str()),
            ("CSVF", "TN"),
            ("UsingCodes", "Y"),
            ("VPD", "Y"),
            ("VFD", "N"),
        ];
        let body = transport.get(&self.endpoint, &query)?.into_body(&what)?;
        parse_csv(&body, &self.series_code)
    }

    fn describe(&self) -> String {
        format!("BOE / Series Code: {}", self.series_code)
    }
}

fn parse_csv(body: &[u8], series_code: &str) -> Result<CanonicalSeries, DataError> {
    let malformed = |detail: String| DataError::Retrieval(format!("BOE {series_code}: {detail}"));

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| malformed(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = *header_map
        .get("date")
        .ok_or_else(|| malformed("response is not a CSV with a DATE column".to_string()))?;
    let value_idx = header_map
        .get(&series_code.to_ascii_lowercase())
        .copied()
        .or_else(|| (0..headers.len()).find(|i| *i != date_idx))
        .ok_or_else(|| malformed("response has no value column".to_string()))?;

    let mut observations = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and records are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| malformed(format!("CSV parse error on line {line}: {e}")))?;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| malformed(format!("invalid date '{raw_date}' on line {line}")))?;

        let raw_value = record.get(value_idx).unwrap_or("");
        let value = if raw_value.is_empty() {
            None
        } else {
            Some(
                raw_value
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("invalid value '{raw_value}' on line {line}")))?,
            )
        };
        observations.push(Observation::new(date, value));
    }

    if observations.is_empty() {
        return Err(malformed("no observations returned".to_string()));
    }

    Ok(CanonicalSeries::new(series_code, observations))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 3] = ["%d %b %Y", "%Y-%m-%d", "%d/%m/%Y"];
    FMTS.iter().find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
