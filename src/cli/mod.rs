//! Command-line parsing for the `databank` binary.
//!
//! Parsing and dispatch stay here and in `crate::app`; nothing below this layer
//! knows about argv.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "databank", version, about = "UK macro data bank (ONS, Bank of England, HM Land Registry)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch series, harmonize them onto one cadence, and print the joined table.
    Fetch(FetchArgs),
    /// List the built-in derived indicators.
    Formulas,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Source for series given without a `SOURCE=` prefix (ONS, BOE, HMLR).
    #[arg(short = 's', long)]
    pub source: Option<String>,

    /// Series to fetch, repeatable: ONS `DATASET:SERIES`, BOE `CODE`, HMLR `variable[@region]`,
    /// optionally prefixed with `SOURCE=`.
    #[arg(long = "series", required = true)]
    pub series: Vec<String>,

    /// Target cadence: m (monthly), q (quarterly), y (annual).
    #[arg(short = 'c', long, default_value = "q")]
    pub cadence: String,

    /// Derived indicator to append, repeatable (see `databank formulas`).
    #[arg(long = "derive")]
    pub derive: Vec<String>,

    /// Column to replace by its natural log, repeatable.
    #[arg(long = "log")]
    pub log: Vec<String>,

    /// Replace every column by its period-over-period fractional change.
    #[arg(long)]
    pub pct_change: bool,

    /// Keep only rows where every column has a value.
    #[arg(long)]
    pub dropna: bool,

    /// Write the aligned table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Rows to print from the end of the table (0 prints all).
    #[arg(long, default_value_t = 12)]
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_series_and_derivations() {
        let cli = Cli::parse_from([
            "databank", "fetch", "--source", "ONS", "--series", "LMS:MGSX", "--series", "QNA:ABMI", "-c", "m",
            "--derive", "log_gdp", "--rows", "0",
        ]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.series, vec!["LMS:MGSX", "QNA:ABMI"]);
        assert_eq!(args.cadence, "m");
        assert_eq!(args.derive, vec!["log_gdp"]);
        assert_eq!(args.rows, 0);
        assert_eq!(args.source.as_deref(), Some("ONS"));
        assert!(args.export.is_none());
        assert!(!args.pct_change && !args.dropna);
    }

    #[test]
    fn parses_mixed_sources_and_transforms() {
        let cli = Cli::parse_from([
            "databank", "fetch", "--series", "ONS=LMS:MGSX", "--series", "HMLR=averagePrice", "--log", "averagePrice",
            "--pct-change", "--dropna",
        ]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.source, None);
        assert_eq!(args.series, vec!["ONS=LMS:MGSX", "HMLR=averagePrice"]);
        assert_eq!(args.log, vec!["averagePrice"]);
        assert!(args.pct_change && args.dropna);
    }

    #[test]
    fn series_is_required() {
        assert!(Cli::try_parse_from(["databank", "fetch", "--source", "BOE"]).is_err());
    }
}
