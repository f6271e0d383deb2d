//! Shared domain types.
//!
//! Series are kept as plain `(date, Option<f64>)` rows: a missing value is a
//! legitimate state (e.g. an optional SPARQL binding, or a grid point created by
//! resampling), not an error.

use std::fmt;

use chrono::NaiveDate;
use log::warn;

use crate::error::DataError;

/// Default region for land-registry queries.
pub const DEFAULT_REGION: &str = "united-kingdom";

/// Reporting cadence, ordered by granularity (annual < quarterly < monthly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cadence {
    Annual,
    Quarterly,
    Monthly,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Annual, Cadence::Quarterly, Cadence::Monthly];

    /// Parse a single-character cadence code (`m`, `q`, `y`).
    pub fn from_code(code: &str) -> Result<Self, DataError> {
        match code {
            "m" => Ok(Cadence::Monthly),
            "q" => Ok(Cadence::Quarterly),
            "y" => Ok(Cadence::Annual),
            other => Err(DataError::InvalidCadence(other.to_string())),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Cadence::Monthly => "m",
            Cadence::Quarterly => "q",
            Cadence::Annual => "y",
        }
    }

    pub fn periods_per_year(self) -> u32 {
        match self {
            Cadence::Annual => 1,
            Cadence::Quarterly => 4,
            Cadence::Monthly => 12,
        }
    }

    /// Length of one period in calendar months.
    pub fn months_per_period(self) -> u32 {
        12 / self.periods_per_year()
    }

    pub fn from_periods_per_year(n: usize) -> Option<Self> {
        match n {
            1 => Some(Cadence::Annual),
            4 => Some(Cadence::Quarterly),
            12 => Some(Cadence::Monthly),
            _ => None,
        }
    }

    /// Key under which the statistics office nests observations of this cadence.
    pub fn ons_key(self) -> &'static str {
        match self {
            Cadence::Monthly => "months",
            Cadence::Quarterly => "quarters",
            Cadence::Annual => "years",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Cadence::Annual => "annual",
            Cadence::Quarterly => "quarterly",
            Cadence::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One dated value; `None` marks a missing observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// A single named column indexed by strictly increasing dates.
///
/// Produced by an ingestor and never mutated afterwards. The optional declared
/// cadence lets a source that knows its own reporting frequency skip detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    name: String,
    observations: Vec<Observation>,
    declared_cadence: Option<Cadence>,
}

impl CanonicalSeries {
    /// Build a series, sorting by date and collapsing duplicate dates (last row wins).
    pub fn new(name: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        let name = name.into();
        observations.sort_by_key(|o| o.date);

        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        let mut duplicates = 0usize;
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => {
                    *last = obs;
                    duplicates += 1;
                }
                _ => deduped.push(obs),
            }
        }
        if duplicates > 0 {
            warn!("{name}: collapsed {duplicates} duplicate date(s), keeping the last value");
        }

        Self {
            name,
            observations: deduped,
            declared_cadence: None,
        }
    }

    pub fn with_declared_cadence(mut self, cadence: Cadence) -> Self {
        self.declared_cadence = Some(cadence);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn declared_cadence(&self) -> Option<Cadence> {
        self.declared_cadence
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A series on the regular period-end grid of a target cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizedSeries {
    name: String,
    cadence: Cadence,
    native_cadence: Cadence,
    interpolated: bool,
    observations: Vec<Observation>,
}

impl HarmonizedSeries {
    pub(crate) fn new(
        name: String,
        cadence: Cadence,
        native_cadence: Cadence,
        interpolated: bool,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            name,
            cadence,
            native_cadence,
            interpolated,
            observations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cadence of the output grid.
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Cadence the source data was reported at.
    pub fn native_cadence(&self) -> Cadence {
        self.native_cadence
    }

    /// Whether spline interpolation filled grid points.
    pub fn interpolated(&self) -> bool {
        self.interpolated
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Treat this series as source data declared at its grid cadence.
    pub fn to_canonical(&self) -> CanonicalSeries {
        CanonicalSeries::new(self.name.clone(), self.observations.clone())
            .with_declared_cadence(self.cadence)
    }
}

/// What to fetch, one variant per data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesRequest {
    /// Statistics office: a time series within a dataset.
    Ons { dataset_id: String, timeseries_id: String },
    /// Central bank: a series code from the interactive database.
    Boe { series_code: String },
    /// Land registry: a house price index variable for a region.
    Hmlr { query_var: String, region: String },
}

impl SeriesRequest {
    pub fn ons(dataset_id: impl Into<String>, timeseries_id: impl Into<String>) -> Self {
        SeriesRequest::Ons {
            dataset_id: dataset_id.into(),
            timeseries_id: timeseries_id.into(),
        }
    }

    pub fn boe(series_code: impl Into<String>) -> Self {
        SeriesRequest::Boe {
            series_code: series_code.into(),
        }
    }

    pub fn hmlr(query_var: impl Into<String>, region: impl Into<String>) -> Self {
        SeriesRequest::Hmlr {
            query_var: query_var.into(),
            region: region.into(),
        }
    }

    /// Parse a command-line series argument for the given source.
    ///
    /// Forms: `ONS` → `DATASET:SERIES`, `BOE` → `CODE`, `HMLR` → `queryVar[@region]`.
    pub fn parse(source: &str, arg: &str) -> Result<Self, DataError> {
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(DataError::InvalidRequest("empty series argument".to_string()));
        }
        match source.to_ascii_uppercase().as_str() {
            "ONS" => {
                let (dataset, series) = arg.split_once(':').ok_or_else(|| {
                    DataError::InvalidRequest(format!("ONS series '{arg}' must look like DATASET:SERIES"))
                })?;
                if dataset.is_empty() || series.is_empty() {
                    return Err(DataError::InvalidRequest(format!(
                        "ONS series '{arg}' must look like DATASET:SERIES"
                    )));
                }
                Ok(SeriesRequest::ons(dataset, series))
            }
            "BOE" => Ok(SeriesRequest::boe(arg)),
            "HMLR" => match arg.split_once('@') {
                Some((var, region)) if !var.is_empty() && !region.is_empty() => {
                    Ok(SeriesRequest::hmlr(var, region))
                }
                Some(_) => Err(DataError::InvalidRequest(format!(
                    "HMLR series '{arg}' must look like queryVar[@region]"
                ))),
                None => Ok(SeriesRequest::hmlr(arg, DEFAULT_REGION)),
            },
            other => Err(DataError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for SeriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRequest::Ons {
                dataset_id,
                timeseries_id,
            } => write!(f, "ONS {dataset_id}:{timeseries_id}"),
            SeriesRequest::Boe { series_code } => write!(f, "BOE {series_code}"),
            SeriesRequest::Hmlr { query_var, region } => write!(f, "HMLR {query_var}@{region}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn cadence_codes_round_trip_and_reject_others() {
        for cadence in Cadence::ALL {
            assert_eq!(Cadence::from_code(cadence.code()).unwrap(), cadence);
        }
        assert!(matches!(Cadence::from_code("w"), Err(DataError::InvalidCadence(c)) if c == "w"));
        assert!(matches!(Cadence::from_code("months"), Err(DataError::InvalidCadence(_))));
    }

    #[test]
    fn cadence_orders_by_granularity() {
        assert!(Cadence::Annual < Cadence::Quarterly);
        assert!(Cadence::Quarterly < Cadence::Monthly);
        assert_eq!(Cadence::Quarterly.months_per_period(), 3);
    }

    #[test]
    fn canonical_series_sorts_and_keeps_last_duplicate() {
        let s = CanonicalSeries::new(
            "X",
            vec![
                Observation::new(d(2020, 3, 31), Some(3.0)),
                Observation::new(d(2020, 1, 31), Some(1.0)),
                Observation::new(d(2020, 3, 31), Some(4.0)),
            ],
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s.observations()[0].date, d(2020, 1, 31));
        assert_eq!(s.observations()[1].value, Some(4.0));
    }

    #[test]
    fn parses_cli_requests_per_source() {
        assert_eq!(SeriesRequest::parse("ons", "LMS:MGSX").unwrap(), SeriesRequest::ons("LMS", "MGSX"));
        assert_eq!(SeriesRequest::parse("BOE", "IUMABEDR").unwrap(), SeriesRequest::boe("IUMABEDR"));
        assert_eq!(
            SeriesRequest::parse("HMLR", "averagePrice").unwrap(),
            SeriesRequest::hmlr("averagePrice", DEFAULT_REGION)
        );
        assert_eq!(
            SeriesRequest::parse("HMLR", "averagePrice@wales").unwrap(),
            SeriesRequest::hmlr("averagePrice", "wales")
        );
        assert!(matches!(SeriesRequest::parse("ONS", "MGSX"), Err(DataError::InvalidRequest(_))));
        assert!(matches!(SeriesRequest::parse("FRED", "X"), Err(DataError::UnknownSource(_))));
    }
}
