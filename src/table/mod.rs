//! Aligned multi-series tables.
//!
//! An `AlignedTable` is the outer join of harmonized series on date: the index is
//! the sorted union of every series' dates, and a series without a row at some
//! date shows a missing value there. All columns share one cadence.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use log::warn;

use crate::domain::{Cadence, HarmonizedSeries};
use crate::error::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    cadence: Cadence,
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl AlignedTable {
    pub fn empty(cadence: Cadence) -> Self {
        Self {
            cadence,
            dates: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Outer-join harmonized series on date, one column per series in order.
    pub fn from_series(cadence: Cadence, series: &[HarmonizedSeries]) -> Result<Self, DataError> {
        if let Some(other) = series.iter().find(|s| s.cadence() != cadence) {
            return Err(DataError::InvalidCadence(format!(
                "series '{}' is on a {} grid, table is {}",
                other.name(),
                other.cadence().display_name(),
                cadence.display_name()
            )));
        }
        let parts = series
            .iter()
            .map(|s| {
                let rows = s.observations().iter().map(|o| (o.date, o.value)).collect();
                (s.name().to_string(), rows)
            })
            .collect();
        Ok(Self::join(cadence, parts))
    }

    /// Outer-join two tables of the same cadence; columns of `self` come first.
    pub fn concat(&self, other: &AlignedTable) -> Result<Self, DataError> {
        if self.cadence != other.cadence {
            return Err(DataError::InvalidCadence(format!(
                "cannot join a {} table with a {} table",
                self.cadence.display_name(),
                other.cadence.display_name()
            )));
        }
        let parts = self.column_rows().into_iter().chain(other.column_rows()).collect();
        Ok(Self::join(self.cadence, parts))
    }

    fn column_rows(&self) -> Vec<(String, Vec<(NaiveDate, Option<f64>)>)> {
        self.columns
            .iter()
            .map(|c| {
                let rows = self.dates.iter().copied().zip(c.values.iter().copied()).collect();
                (c.name.clone(), rows)
            })
            .collect()
    }

    fn join(cadence: Cadence, parts: Vec<(String, Vec<(NaiveDate, Option<f64>)>)>) -> Self {
        let dates: Vec<NaiveDate> = parts
            .iter()
            .flat_map(|(_, rows)| rows.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: HashMap<NaiveDate, usize> = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut columns: Vec<Column> = Vec::with_capacity(parts.len());
        for (name, rows) in parts {
            if columns.iter().any(|c| c.name == name) {
                warn!("duplicate column '{name}' in aligned table");
            }
            let mut values = vec![None; dates.len()];
            for (date, value) in rows {
                values[position[&date]] = value;
            }
            columns.push(Column { name, values });
        }

        Self { cadence, dates, columns }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of the first column called `name`.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Append a column aligned to the existing dates.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<(), DataError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(DataError::InvalidRequest(format!(
                "column '{name}' has {} values, table has {} rows",
                values.len(),
                self.dates.len()
            )));
        }
        if self.has_column(&name) {
            warn!("duplicate column '{name}' in aligned table");
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Apply `f` to every present value of a column; non-finite results become missing.
    pub fn map_column(&mut self, name: &str, f: impl Fn(f64) -> f64) -> Result<(), DataError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::MissingVariables(vec![name.to_string()]))?;
        for value in column.values.iter_mut() {
            *value = value.map(&f).filter(|v| v.is_finite());
        }
        Ok(())
    }

    /// Period-over-period fractional change of every column.
    ///
    /// The first row, and any row whose value or predecessor is missing or whose
    /// predecessor is zero, is missing.
    pub fn pct_change(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut values = Vec::with_capacity(c.values.len());
                values.extend(c.values.first().map(|_| None));
                values.extend(c.values.windows(2).map(|w| match (w[0], w[1]) {
                    (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                    _ => None,
                }));
                Column {
                    name: c.name.clone(),
                    values,
                }
            })
            .collect();
        Self {
            cadence: self.cadence,
            dates: self.dates.clone(),
            columns,
        }
    }

    /// Keep only rows where every column has a value.
    pub fn drop_missing(&self) -> Self {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&i| self.columns.iter().all(|c| c.values[i].is_some()))
            .collect();
        Self {
            cadence: self.cadence,
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: keep.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }
}
