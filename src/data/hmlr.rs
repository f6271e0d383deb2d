//! HM Land Registry UK House Price Index, via the linked-data SPARQL endpoint.
//!
//! Each monthly index record (`ukhpi:refMonth`) for a region is selected in date
//! order, with the requested variable as an `OPTIONAL` binding. Records without
//! the variable become missing values.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::data::Ingestor;
use crate::data::transport::Transport;
use crate::domain::{Cadence, CanonicalSeries, Observation, SeriesRequest};
use crate::error::DataError;
use crate::harmonize::grid::period_end;

const REGION_BASE: &str = "http://landregistry.data.gov.uk/id/region/";

#[derive(Debug, Clone)]
pub struct HmlrIngestor {
    endpoint: String,
    query_var: String,
    region: String,
}

impl HmlrIngestor {
    /// Both names are interpolated into the query, so they are restricted to
    /// identifier characters.
    pub fn new(endpoint: &str, query_var: &str, region: &str) -> Result<Self, DataError> {
        for (label, value) in [("query variable", query_var), ("region", region)] {
            let valid = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(DataError::InvalidRequest(format!("HMLR {label} '{value}' is not a plain identifier")));
            }
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            query_var: query_var.to_string(),
            region: region.to_string(),
        })
    }

    pub fn from_request(request: &SeriesRequest, endpoint: &str) -> Result<Self, DataError> {
        match request {
            SeriesRequest::Hmlr { query_var, region } => Self::new(endpoint, query_var, region),
            other => Err(DataError::RequestMismatch {
                source_name: crate::data::HMLR.to_string(),
                request: other.to_string(),
            }),
        }
    }

    pub fn query(&self) -> String {
        let var = &self.query_var;
        let region = format!("<{REGION_BASE}{}>", self.region);
        format!(
            "PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>\n\
             PREFIX ukhpi: <http://landregistry.data.gov.uk/def/ukhpi/>\n\
             SELECT *\n\
             WHERE {{\n  \
               {{ SELECT ?DATE ?item\n     \
                  WHERE {{ ?item ukhpi:refRegion {region} ; ukhpi:refMonth ?DATE }}\n     \
                  ORDER BY ?DATE\n  \
               }}\n  \
               OPTIONAL {{ ?item ukhpi:{var} ?{var} }}\n  \
               BIND({region} AS ?Region)\n\
             }}"
        )
    }
}

impl Ingestor for HmlrIngestor {
    fn fetch(&self, transport: &dyn Transport, _cadence: Cadence) -> Result<CanonicalSeries, DataError> {
        let what = format!("HMLR {}@{}", self.query_var, self.region);
        let query = self.query();
        let body = transport
            .get(&self.endpoint, &[("query", query.as_str()), ("output", "json")])?
            .into_body(&what)?;
        let results: SparqlResults = serde_json::from_slice(&body)
            .map_err(|e| DataError::Retrieval(format!("{what}: malformed SPARQL JSON: {e}")))?;
        parse_results(&results, &self.query_var, &what)
    }

    fn describe(&self) -> String {
        format!("HMLR / Query Variable: {} / Region: {}", self.query_var, self.region)
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    head: SparqlHead,
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlHead {
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

fn parse_results(results: &SparqlResults, query_var: &str, what: &str) -> Result<CanonicalSeries, DataError> {
    if !results.head.vars.iter().any(|v| v == query_var) {
        return Err(DataError::Retrieval(format!("{what}: result has no '{query_var}' column")));
    }
    if results.results.bindings.is_empty() {
        return Err(DataError::Retrieval(format!("{what}: no observations returned")));
    }

    let observations = results
        .results
        .bindings
        .iter()
        .map(|row| {
            let raw_date = row
                .get("DATE")
                .map(|t| t.value.as_str())
                .ok_or_else(|| DataError::Retrieval(format!("{what}: row without DATE binding")))?;
            let date = parse_ref_month(raw_date)
                .ok_or_else(|| DataError::Retrieval(format!("{what}: invalid refMonth '{raw_date}'")))?;
            let value = match row.get(query_var) {
                None => None,
                Some(term) => Some(term.value.trim().parse::<f64>().map_err(|_| {
                    DataError::Retrieval(format!("{what}: invalid value '{}' at {raw_date}", term.value))
                })?),
            };
            Ok(Observation::new(date, value))
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    Ok(CanonicalSeries::new(query_var, observations))
}

/// `"2020-01"` or `"2020-01-01"` → `2020-01-31`.
fn parse_ref_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let first = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()?;
    period_end(first, Cadence::Monthly).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transport::{RawResponse, StaticTransport};

    const URL: &str = "https://hmlr.test/query";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn binding(date: &str, value: Option<&str>) -> String {
        let value = value
            .map(|v| format!(r#", "averagePrice": {{"type": "literal", "value": "{v}"}}"#))
            .unwrap_or_default();
        format!(r#"{{"DATE": {{"type": "literal", "value": "{date}"}}, "item": {{"type": "uri", "value": "x"}}{value}}}"#)
    }

    fn body(rows: &[String]) -> String {
        format!(
            r#"{{"head": {{"vars": ["DATE", "item", "averagePrice", "Region"]}}, "results": {{"bindings": [{}]}}}}"#,
            rows.join(",")
        )
    }

    fn fetch(body: &str) -> Result<CanonicalSeries, DataError> {
        let transport = StaticTransport::new().route_with_param(URL, "query", "ukhpi:averagePrice", RawResponse::ok(body));
        HmlrIngestor::new(URL, "averagePrice", "united-kingdom")
            .unwrap()
            .fetch(&transport, Cadence::Monthly)
    }

    #[test]
    fn query_filters_region_and_selects_variable() {
        let q = HmlrIngestor::new(URL, "housePriceIndex", "wales").unwrap().query();
        assert!(q.contains("<http://landregistry.data.gov.uk/id/region/wales>"));
        assert!(q.contains("OPTIONAL { ?item ukhpi:housePriceIndex ?housePriceIndex }"));
        assert!(q.contains("ORDER BY ?DATE"));
    }

    #[test]
    fn optional_values_become_missing() {
        let s = fetch(&body(&[
            binding("2020-02", Some("250100")),
            binding("2020-01", Some("249000.5")),
            binding("2020-03-01", None),
        ]))
        .unwrap();
        assert_eq!(s.name(), "averagePrice");
        let obs = s.observations();
        assert_eq!(obs[0], Observation::new(d(2020, 1, 31), Some(249000.5)));
        assert_eq!(obs[1], Observation::new(d(2020, 2, 29), Some(250100.0)));
        assert_eq!(obs[2], Observation::new(d(2020, 3, 31), None));
    }

    #[test]
    fn malformed_results_are_retrieval_errors() {
        assert!(matches!(fetch(&body(&[])), Err(DataError::Retrieval(_))));
        assert!(matches!(fetch(&body(&[binding("March", Some("1"))])), Err(DataError::Retrieval(_))));
        assert!(matches!(fetch(&body(&[binding("2020-01", Some("lots"))])), Err(DataError::Retrieval(_))));
        let wrong_vars = r#"{"head": {"vars": ["DATE"]}, "results": {"bindings": []}}"#;
        assert!(matches!(fetch(wrong_vars), Err(DataError::Retrieval(_))));
    }

    #[test]
    fn rejects_non_identifier_input() {
        assert!(matches!(
            HmlrIngestor::new(URL, "averagePrice } DROP", "uk"),
            Err(DataError::InvalidRequest(_))
        ));
        assert!(matches!(
            HmlrIngestor::from_request(&SeriesRequest::ons("A", "B"), URL),
            Err(DataError::RequestMismatch { .. })
        ));
    }
}
