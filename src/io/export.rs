//! Export aligned tables to CSV.
//!
//! One `DATE` column (ISO dates) followed by one column per series. Missing values
//! are written as empty fields, which spreadsheets and dataframe readers both
//! treat as NA.

use std::path::Path;

use crate::error::DataError;
use crate::table::AlignedTable;

/// Write `table` to `path`, replacing any existing file.
pub fn write_table_csv(path: &Path, table: &AlignedTable) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)?;
    write_table(&mut writer, table)?;
    writer.flush()?;
    Ok(())
}

/// Render `table` as CSV text.
pub fn table_to_csv_string(table: &AlignedTable) -> Result<String, DataError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_table(&mut writer, table)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| DataError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| DataError::Io(std::io::Error::other(e)))
}

fn write_table<W: std::io::Write>(writer: &mut csv::Writer<W>, table: &AlignedTable) -> Result<(), DataError> {
    let mut header = Vec::with_capacity(table.n_cols() + 1);
    header.push("DATE".to_string());
    header.extend(table.column_names().into_iter().map(str::to_string));
    writer.write_record(&header)?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        for column in table.columns() {
            record.push(column.values[row].map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    Ok(())
}
