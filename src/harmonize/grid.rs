//! Calendar grid of period ends.
//!
//! Dates are mapped to a month index (`year * 12 + month0`); a period of a given
//! cadence is a run of `months_per_period` consecutive indices aligned to the
//! calendar year, labelled by the last day of its final month.

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::Cadence;
use crate::error::DataError;

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Month index of the final month of the period containing `date`.
pub fn period_key(date: NaiveDate, cadence: Cadence) -> i64 {
    let len = i64::from(cadence.months_per_period());
    let idx = month_index(date);
    idx - idx.rem_euclid(len) + len - 1
}

/// Last calendar day of the month with the given index.
pub fn month_end(index: i64) -> Result<NaiveDate, DataError> {
    let out_of_range = || DataError::DateOutOfRange(format!("month index {index}"));
    let year = i32::try_from(index.div_euclid(12)).map_err(|_| out_of_range())?;
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .ok_or_else(out_of_range)
}

/// End date of the period containing `date`.
pub fn period_end(date: NaiveDate, cadence: Cadence) -> Result<NaiveDate, DataError> {
    month_end(period_key(date, cadence))
}

/// Every period end from the period containing `first` to the one containing `last`.
pub fn period_grid(first: NaiveDate, last: NaiveDate, cadence: Cadence) -> Result<Vec<(i64, NaiveDate)>, DataError> {
    let step = i64::from(cadence.months_per_period());
    let start = period_key(first, cadence);
    let end = period_key(last, cadence);

    let mut out = Vec::new();
    let mut key = start;
    while key <= end {
        out.push((key, month_end(key)?));
        key += step;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn period_ends_per_cadence() {
        let date = d(2020, 2, 10);
        assert_eq!(period_end(date, Cadence::Monthly).unwrap(), d(2020, 2, 29));
        assert_eq!(period_end(date, Cadence::Quarterly).unwrap(), d(2020, 3, 31));
        assert_eq!(period_end(date, Cadence::Annual).unwrap(), d(2020, 12, 31));
        assert_eq!(period_end(d(2021, 11, 30), Cadence::Quarterly).unwrap(), d(2021, 12, 31));
    }

    #[test]
    fn grid_covers_first_to_last_period() {
        let grid = period_grid(d(2019, 12, 31), d(2020, 12, 31), Cadence::Quarterly).unwrap();
        let dates: Vec<NaiveDate> = grid.into_iter().map(|(_, dt)| dt).collect();
        assert_eq!(
            dates,
            vec![d(2019, 12, 31), d(2020, 3, 31), d(2020, 6, 30), d(2020, 9, 30), d(2020, 12, 31)]
        );
    }

    #[test]
    fn grid_handles_negative_years() {
        let grid = period_grid(d(-1, 11, 5), d(0, 1, 5), Cadence::Monthly).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[2].1, d(0, 1, 31));
    }
}
