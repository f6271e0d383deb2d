//! Derived indicators.
//!
//! A `Formula` names the columns it needs and computes one new series from them,
//! row by row over an aligned table. Undefined arithmetic (a missing input, a
//! division by zero, the log of a non-positive number) gives a missing value.

use log::debug;

use crate::error::DataError;
use crate::table::AlignedTable;

type Evaluate = Box<dyn Fn(&FormulaInputs<'_>) -> Vec<Option<f64>>>;

pub struct Formula {
    name: String,
    description: String,
    required: Vec<String>,
    evaluate: Evaluate,
}

impl Formula {
    pub fn new<F>(name: &str, description: &str, required: &[&str], evaluate: F) -> Self
    where
        F: Fn(&FormulaInputs<'_>) -> Vec<Option<f64>> + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: required.iter().map(|s| s.to_string()).collect(),
            evaluate: Box::new(evaluate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// Read-only view of the table handed to a formula.
pub struct FormulaInputs<'a> {
    table: &'a AlignedTable,
}

impl<'a> FormulaInputs<'a> {
    /// Column values; an unknown name reads as all-missing.
    pub fn column(&self, name: &str) -> &'a [Option<f64>] {
        self.table.column(name).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.table.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.n_rows() == 0
    }

    pub fn periods_per_year(&self) -> usize {
        self.table.cadence().periods_per_year() as usize
    }

    /// `f(x_t)` for every row.
    pub fn map(&self, name: &str, f: impl Fn(f64) -> f64) -> Vec<Option<f64>> {
        let col = self.column(name);
        (0..self.len()).map(|i| finite(at(col, i).map(&f))).collect()
    }

    /// `f(a_t, b_t)` for every row.
    pub fn zip(&self, a: &str, b: &str, f: impl Fn(f64, f64) -> f64) -> Vec<Option<f64>> {
        let (a, b) = (self.column(a), self.column(b));
        (0..self.len())
            .map(|i| match (at(a, i), at(b, i)) {
                (Some(x), Some(y)) => finite(Some(f(x, y))),
                _ => None,
            })
            .collect()
    }

    /// `f(x_t, x_{t-lag})` for every row; the first `lag` rows are missing.
    pub fn lagged(&self, name: &str, lag: usize, f: impl Fn(f64, f64) -> f64) -> Vec<Option<f64>> {
        let col = self.column(name);
        (0..self.len())
            .map(|i| {
                let prev = i.checked_sub(lag).and_then(|j| at(col, j));
                match (at(col, i), prev) {
                    (Some(cur), Some(prev)) => finite(Some(f(cur, prev))),
                    _ => None,
                }
            })
            .collect()
    }
}

fn at(col: &[Option<f64>], i: usize) -> Option<f64> {
    col.get(i).copied().flatten()
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// A computed column, aligned to the dates of the table it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Default)]
pub struct IndicatorBook {
    formulas: Vec<Formula>,
}

impl IndicatorBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book with the standard macro indicators.
    pub fn builtin() -> Self {
        let mut book = Self::new();
        book.register(Formula::new(
            "real_bank_rate",
            "Bank Rate minus CPI annual inflation (IUMABEDR - D7G7)",
            &["IUMABEDR", "D7G7"],
            |x| x.zip("IUMABEDR", "D7G7", |rate, cpi| rate - cpi),
        ));
        book.register(Formula::new(
            "gdp_deflator",
            "Implied GDP deflator, nominal over real GDP (100 * YBHA / ABMI)",
            &["YBHA", "ABMI"],
            |x| x.zip("YBHA", "ABMI", |nominal, real| 100.0 * nominal / real),
        ));
        book.register(Formula::new(
            "log_gdp",
            "Natural log of real GDP (ln ABMI)",
            &["ABMI"],
            |x| x.map("ABMI", f64::ln),
        ));
        book.register(Formula::new(
            "gdp_growth_yoy",
            "Real GDP growth on a year earlier, log points (100 * (ln ABMI_t - ln ABMI_t-p))",
            &["ABMI"],
            |x| x.lagged("ABMI", x.periods_per_year(), |cur, prev| 100.0 * (cur.ln() - prev.ln())),
        ));
        book.register(Formula::new(
            "house_price_yoy",
            "House price index change on a year earlier, percent",
            &["housePriceIndex"],
            |x| {
                x.lagged("housePriceIndex", x.periods_per_year(), |cur, prev| {
                    100.0 * (cur / prev - 1.0)
                })
            },
        ));
        book
    }

    /// Add a formula, replacing any with the same name.
    pub fn register(&mut self, formula: Formula) {
        match self.formulas.iter_mut().find(|f| f.name == formula.name) {
            Some(slot) => *slot = formula,
            None => self.formulas.push(formula),
        }
    }

    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.name == name)
    }

    pub fn compute(&self, table: &AlignedTable, name: &str) -> Result<DerivedSeries, DataError> {
        let formula = self
            .get(name)
            .ok_or_else(|| DataError::UnknownFormula(name.to_string()))?;

        let missing: Vec<String> = formula
            .required
            .iter()
            .filter(|col| !table.has_column(col))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DataError::MissingVariables(missing));
        }

        let values = (formula.evaluate)(&FormulaInputs { table });
        debug!(
            "{name}: {} of {} rows defined",
            values.iter().filter(|v| v.is_some()).count(),
            values.len()
        );
        Ok(DerivedSeries {
            name: formula.name.clone(),
            values,
        })
    }

    /// Compute `name` and append it to `table` as a new column.
    pub fn compute_into(&self, table: &mut AlignedTable, name: &str) -> Result<(), DataError> {
        let derived = self.compute(table, name)?;
        table.insert_column(derived.name, derived.values)
    }
}
