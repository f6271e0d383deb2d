//! Native cadence detection.

use std::collections::HashSet;

use chrono::Datelike;

use crate::domain::{Cadence, CanonicalSeries};
use crate::error::DataError;

/// Infer the reporting cadence from the distinct calendar months in the index.
///
/// 1 distinct month is annual, 4 quarterly, 12 monthly. Any other count is
/// reported as ambiguous instead of guessed.
pub fn detect(series: &CanonicalSeries) -> Result<Cadence, DataError> {
    let months: HashSet<u32> = series.observations().iter().map(|o| o.date.month()).collect();
    Cadence::from_periods_per_year(months.len()).ok_or_else(|| DataError::AmbiguousCadence {
        series: series.name().to_string(),
        distinct_months: months.len(),
    })
}

/// Declared cadence if the source supplied one, otherwise the detected one.
pub fn native_cadence(series: &CanonicalSeries) -> Result<Cadence, DataError> {
    match series.declared_cadence() {
        Some(cadence) => Ok(cadence),
        None => detect(series),
    }
}
