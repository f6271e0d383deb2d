//! Plain-text rendering of aligned tables and the retrieval log.

use crate::indicators::IndicatorBook;
use crate::registry::LogEntry;
use crate::table::AlignedTable;

const COL_WIDTH: usize = 14;

/// Render the last `max_rows` rows of `table` (all rows when `max_rows` is 0).
pub fn format_table(table: &AlignedTable, max_rows: usize) -> String {
    let mut out = String::new();
    let w = COL_WIDTH;

    let shown = if max_rows == 0 { table.n_rows() } else { max_rows.min(table.n_rows()) };
    out.push_str(&format!(
        "{} rows x {} columns ({}), showing last {shown}\n",
        table.n_rows(),
        table.n_cols(),
        table.cadence().display_name()
    ));

    let mut header = format!("{:<10}", "DATE");
    let mut rule = format!("{:-<10}", "");
    for name in table.column_names() {
        header.push_str(&format!(" {:>w$}", truncate(name, w)));
        rule.push_str(&format!(" {:-<w$}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    let start = table.n_rows() - shown;
    for (row, date) in table.dates().iter().enumerate().skip(start) {
        let mut line = date.format("%Y-%m-%d").to_string();
        for column in table.columns() {
            line.push_str(&format!(" {:>w$}", fmt_value(column.values[row])));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// One numbered line per retrieved series.
pub fn format_call_log(entries: &[LogEntry]) -> String {
    let mut out = String::from("Retrieved series:\n");
    if entries.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{:>3}. {entry}\n", i + 1));
    }
    out
}

/// Formula names, inputs and descriptions.
pub fn format_formulas(book: &IndicatorBook) -> String {
    let mut out = String::new();
    for formula in book.formulas() {
        out.push_str(&format!(
            "{:<16} [{}]\n    {}\n",
            formula.name(),
            formula.required().join(", "),
            formula.description()
        ));
    }
    out
}

fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.4}"),
        None => "NA".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('.');
    out
}
