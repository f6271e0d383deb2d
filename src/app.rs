//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module parses
//! arguments, builds the registry, and prints or exports the result.

use clap::Parser;
use log::info;

use crate::cli::{Command, FetchArgs};
use crate::config::SourceConfig;
use crate::data::HttpTransport;
use crate::domain::SeriesRequest;
use crate::error::{AppError, DataError};
use crate::indicators::IndicatorBook;
use crate::registry::Registry;
use crate::table::AlignedTable;

/// Entry point for the `databank` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fetch(args) => handle_fetch(&args),
        Command::Formulas => {
            print!("{}", crate::report::format_formulas(&IndicatorBook::builtin()));
            Ok(())
        }
    }
}

fn handle_fetch(args: &FetchArgs) -> Result<(), AppError> {
    let config = SourceConfig::from_env()?;
    let transport = HttpTransport::new(config.timeout())?;
    let mut registry = Registry::with_builtin_sources(Box::new(transport), &config);

    let table = fetch_table(&mut registry, &IndicatorBook::builtin(), args)?;

    println!("{}", crate::report::format_call_log(registry.call_log()));
    print!("{}", crate::report::format_table(&table, args.rows));

    if let Some(path) = &args.export {
        crate::io::export::write_table_csv(path, &table)?;
        info!("wrote {} rows to {}", table.n_rows(), path.display());
    }

    Ok(())
}

/// Retrieve every series argument, one batch per source, and join the batches.
///
/// Derived columns are appended to the joined table, then `--log`, `--pct-change`
/// and `--dropna` are applied in that order.
pub fn fetch_table(registry: &mut Registry, book: &IndicatorBook, args: &FetchArgs) -> Result<AlignedTable, AppError> {
    let mut batches: Vec<(String, Vec<SeriesRequest>)> = Vec::new();
    for arg in &args.series {
        let (source, request) = parse_series_arg(args.source.as_deref(), arg)?;
        match batches.iter_mut().find(|(name, _)| *name == source) {
            Some((_, requests)) => requests.push(request),
            None => batches.push((source, vec![request])),
        }
    }

    let mut table: Option<AlignedTable> = None;
    for (source, requests) in &batches {
        let batch = registry.retrieve(source, requests, &args.cadence)?;
        table = Some(match table {
            Some(joined) => joined.concat(&batch)?,
            None => batch,
        });
    }
    let mut table = table.ok_or_else(|| AppError::new(2, "no series requested"))?;

    for name in &args.derive {
        book.compute_into(&mut table, name)?;
    }
    for name in &args.log {
        table.map_column(name, f64::ln)?;
    }
    if args.pct_change {
        table = table.pct_change();
    }
    if args.dropna {
        table = table.drop_missing();
    }
    Ok(table)
}

/// Split `SOURCE=SERIES` (or a bare `SERIES` read against `default_source`).
fn parse_series_arg(default_source: Option<&str>, arg: &str) -> Result<(String, SeriesRequest), DataError> {
    let (source, series) = match arg.split_once('=') {
        Some((source, series)) => (source.trim(), series.trim()),
        None => {
            let source = default_source.ok_or_else(|| {
                DataError::InvalidRequest(format!("series '{arg}' has no source: pass --source or SOURCE={arg}"))
            })?;
            (source, arg)
        }
    };
    let request = SeriesRequest::parse(source, series)?;
    Ok((source.to_ascii_uppercase(), request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawResponse, StaticTransport};

    const BOE_URL: &str = "https://boe.test/iadb";

    fn registry() -> Registry {
        let csv = |code: &str, values: [f64; 4]| {
            let mut body = format!("DATE,{code}\n");
            for (month, v) in ["Mar", "Jun", "Sep", "Dec"].iter().zip(values) {
                body.push_str(&format!("28 {month} 2022,{v}\n"));
            }
            RawResponse::ok(body)
        };
        let transport = StaticTransport::new()
            .route_with_param(BOE_URL, "SeriesCodes", "IUMABEDR", csv("IUMABEDR", [0.75, 1.25, 2.25, 3.5]))
            .route_with_param(BOE_URL, "SeriesCodes", "D7G7", csv("D7G7", [7.0, 9.4, 10.1, 10.5]));
        let config = SourceConfig {
            boe_url: BOE_URL.to_string(),
            ..SourceConfig::default()
        };
        Registry::with_builtin_sources(Box::new(transport), &config)
    }

    fn args(series: &[&str], derive: &[&str]) -> FetchArgs {
        FetchArgs {
            source: Some("BOE".to_string()),
            series: series.iter().map(|s| s.to_string()).collect(),
            cadence: "q".to_string(),
            derive: derive.iter().map(|s| s.to_string()).collect(),
            log: Vec::new(),
            pct_change: false,
            dropna: false,
            export: None,
            rows: 12,
        }
    }

    #[test]
    fn fetch_with_derived_column() {
        let mut registry = registry();
        let table = fetch_table(&mut registry, &IndicatorBook::builtin(), &args(&["IUMABEDR", "D7G7"], &["real_bank_rate"])).unwrap();
        assert_eq!(table.column_names(), vec!["IUMABEDR", "D7G7", "real_bank_rate"]);
        let real = table.column("real_bank_rate").unwrap();
        assert!((real[3].unwrap() - (3.5 - 10.5)).abs() < 1e-12);
        assert_eq!(registry.call_log().len(), 2);
    }

    #[test]
    fn missing_inputs_map_to_data_exit_code() {
        let mut registry = registry();
        let err = fetch_table(&mut registry, &IndicatorBook::builtin(), &args(&["IUMABEDR"], &["real_bank_rate"])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("D7G7"));
    }

    #[test]
    fn bad_cadence_maps_to_input_exit_code() {
        let mut registry = registry();
        let mut a = args(&["IUMABEDR"], &[]);
        a.cadence = "weekly".to_string();
        let err = fetch_table(&mut registry, &IndicatorBook::builtin(), &a).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn prefixed_and_bare_series_share_a_batch() {
        let mut registry = registry();
        let table = fetch_table(&mut registry, &IndicatorBook::builtin(), &args(&["boe=IUMABEDR", "D7G7"], &[])).unwrap();
        assert_eq!(table.column_names(), vec!["IUMABEDR", "D7G7"]);
        assert!(registry.call_log().iter().all(|e| e.source == "BOE"));
    }

    #[test]
    fn series_without_source_is_rejected() {
        let mut registry = registry();
        let mut a = args(&["IUMABEDR"], &[]);
        a.source = None;
        let err = fetch_table(&mut registry, &IndicatorBook::builtin(), &a).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(registry.call_log().is_empty());
    }

    #[test]
    fn joins_sources_then_logs_differences_and_drops_gaps() {
        let ons_body = r#"{"quarters": [
            {"date": "2022 Q1", "value": "4.0"},
            {"date": "2022 Q2", "value": "4.2"},
            {"date": "2022 Q3", "value": "4.8"},
            {"date": "2022 Q4", "value": "5.1"}
        ]}"#;
        let rows: Vec<String> = (1..=12)
            .map(|m| {
                format!(
                    r#"{{"DATE": {{"value": "2022-{m:02}"}}, "averagePrice": {{"value": "{}"}}}}"#,
                    200_000 + 1_000 * m
                )
            })
            .collect();
        let hmlr_body = format!(
            r#"{{"head": {{"vars": ["DATE", "item", "averagePrice", "Region"]}}, "results": {{"bindings": [{}]}}}}"#,
            rows.join(",")
        );
        let config = SourceConfig {
            ons_url: "https://ons.test/timeseries".to_string(),
            hmlr_url: "https://hmlr.test/query".to_string(),
            ..SourceConfig::default()
        };
        let transport = StaticTransport::new()
            .route("https://ons.test/timeseries/MGSX/dataset/LMS/data", RawResponse::ok(ons_body))
            .route_with_param("https://hmlr.test/query", "query", "ukhpi:averagePrice", RawResponse::ok(hmlr_body));
        let mut registry = Registry::with_builtin_sources(Box::new(transport), &config);

        let mut a = args(&["ONS=LMS:MGSX", "HMLR=averagePrice"], &[]);
        a.source = None;
        a.log = vec!["averagePrice".to_string()];
        a.pct_change = true;
        a.dropna = true;
        let table = fetch_table(&mut registry, &IndicatorBook::builtin(), &a).unwrap();

        assert_eq!(table.column_names(), vec!["MGSX", "averagePrice"]);
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.dates()[0], chrono::NaiveDate::from_ymd_opt(2022, 6, 30).unwrap());
        assert!((table.column("MGSX").unwrap()[0].unwrap() - 0.05).abs() < 1e-12);
        let expected = 206_000f64.ln() / 203_000f64.ln() - 1.0;
        assert!((table.column("averagePrice").unwrap()[0].unwrap() - expected).abs() < 1e-12);
        assert_eq!(registry.call_log().len(), 2);
    }
}
