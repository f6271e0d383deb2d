//! Put a canonical series onto the regular grid of a target cadence.
//!
//! Two paths:
//!
//! - **direct**: the target has no more periods per year than the source. Each
//!   grid period takes the last present value observed inside it; nothing is
//!   synthesised.
//! - **interpolation**: the target is finer than the source. The series is binned
//!   onto the finer grid (leaving gaps), the ragged ends are trimmed, and the gaps
//!   are filled by an interpolating cubic spline through the present values.
//!
//! Either way the final row always carries a value.

use std::collections::HashMap;

use chrono::Datelike;
use log::debug;

use crate::domain::{Cadence, CanonicalSeries, HarmonizedSeries, Observation};
use crate::error::DataError;
use crate::harmonize::detect::native_cadence;
use crate::harmonize::grid::{period_grid, period_key};
use crate::math::CubicSpline;

/// True when the target needs more periods per year than the source provides.
pub fn requires_interpolation(native: Cadence, target: Cadence) -> bool {
    target.periods_per_year() > native.periods_per_year()
}

/// Harmonize `series` onto the `target` cadence grid.
pub fn harmonize(series: &CanonicalSeries, target: Cadence) -> Result<HarmonizedSeries, DataError> {
    let (first, last) = match (series.observations().first(), series.observations().last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(DataError::EmptySeries(series.name().to_string())),
    };

    let native = native_cadence(series)?;
    let interpolate = requires_interpolation(native, target);

    let mut rows = bin_onto_grid(series, first, last, target)?;
    trim_trailing_missing(&mut rows);
    if interpolate {
        trim_leading_missing(&mut rows);
    }
    if rows.is_empty() {
        return Err(DataError::EmptySeries(series.name().to_string()));
    }

    if interpolate {
        fill_gaps(&mut rows, series.name())?;
    }

    debug!(
        "{}: native={} target={} path={} rows={}",
        series.name(),
        native.display_name(),
        target.display_name(),
        if interpolate { "interpolate" } else { "direct" },
        rows.len()
    );

    Ok(HarmonizedSeries::new(
        series.name().to_string(),
        target,
        native,
        interpolate,
        rows,
    ))
}

fn bin_onto_grid(
    series: &CanonicalSeries,
    first: chrono::NaiveDate,
    last: chrono::NaiveDate,
    target: Cadence,
) -> Result<Vec<Observation>, DataError> {
    // Observations are sorted, so overwriting keeps the as-of (latest) value per period.
    let mut bins: HashMap<i64, f64> = HashMap::new();
    for obs in series.observations() {
        if let Some(value) = obs.value {
            bins.insert(period_key(obs.date, target), value);
        }
    }

    Ok(period_grid(first, last, target)?
        .into_iter()
        .map(|(key, date)| Observation::new(date, bins.get(&key).copied()))
        .collect())
}

fn trim_trailing_missing(rows: &mut Vec<Observation>) {
    let keep = rows.iter().rposition(|o| o.value.is_some()).map_or(0, |i| i + 1);
    rows.truncate(keep);
}

fn trim_leading_missing(rows: &mut Vec<Observation>) {
    let skip = rows.iter().position(|o| o.value.is_some()).unwrap_or(rows.len());
    rows.drain(..skip);
}

fn abscissa(obs: &Observation) -> f64 {
    f64::from(obs.date.num_days_from_ce())
}

fn fill_gaps(rows: &mut [Observation], name: &str) -> Result<(), DataError> {
    if rows.iter().all(|o| o.value.is_some()) {
        return Ok(());
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|o| o.value.map(|v| (abscissa(o), v)))
        .unzip();

    let spline = CubicSpline::fit(&xs, &ys).ok_or_else(|| {
        DataError::Spline(format!("{name}: could not fit through {} points", xs.len()))
    })?;

    for row in rows.iter_mut().filter(|o| o.value.is_none()) {
        row.value = Some(spline.eval(abscissa(row)));
    }
    Ok(())
}
