//! Loader for daily simulation results stored as CSV.
//!
//! The file holds one row per trading day with the schema:
//! - Date (YYYY-MM-DD)
//! - Benchmark_Cashflow, Benchmark_Portfolio
//! - Strategy_Cashflow, Strategy_Portfolio
//!
//! Extra columns are ignored.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use super::types::{DailyResult, DailyResults, TableError};

pub const DATE_COLUMN: &str = "Date";
pub const BENCHMARK_CASHFLOW_COLUMN: &str = "Benchmark_Cashflow";
pub const BENCHMARK_PORTFOLIO_COLUMN: &str = "Benchmark_Portfolio";
pub const STRATEGY_CASHFLOW_COLUMN: &str = "Strategy_Cashflow";
pub const STRATEGY_PORTFOLIO_COLUMN: &str = "Strategy_Portfolio";

/// Required columns in a results file.
pub const EXPECTED_COLUMNS: &[&str] = &[
    DATE_COLUMN,
    BENCHMARK_CASHFLOW_COLUMN,
    BENCHMARK_PORTFOLIO_COLUMN,
    STRATEGY_CASHFLOW_COLUMN,
    STRATEGY_PORTFOLIO_COLUMN,
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CSV loader for daily results tables.
pub struct ResultsLoader {
    path: PathBuf,
}

impl ResultsLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw CSV into a DataFrame.
    pub fn load_dataframe(&self) -> Result<DataFrame, LoaderError> {
        read_csv(&self.path)
    }

    /// Load and convert into a typed results table.
    pub fn load(&self) -> Result<DailyResults, LoaderError> {
        let df = self.load_dataframe()?;
        let results = dataframe_to_results(&df)?;
        debug!(
            "Loaded {} daily rows from {} ({} to {})",
            results.len(),
            self.path.display(),
            results.first_date(),
            results.last_date()
        );
        Ok(results)
    }
}

/// Read a CSV file with a header row.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.display().to_string()));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Fail if any of `columns` is absent from `df`.
pub(crate) fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), LoaderError> {
    let schema = df.schema();
    for name in columns {
        if !schema.contains(name) {
            return Err(LoaderError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Parse a date column stored either as `YYYY-MM-DD` strings or as a
/// Date dtype. Unparseable entries come back as `None`.
pub(crate) fn parse_date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    let column = df.column(name)?;

    if let Ok(str_col) = column.str() {
        Ok(str_col
            .into_iter()
            .map(|s| s.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
            .collect())
    } else if let Ok(date_col) = column.date() {
        Ok(date_col.into_iter().map(|d| d.map(date_from_days)).collect())
    } else {
        Err(LoaderError::InvalidData(format!(
            "{} column has unexpected type {}",
            name,
            column.dtype()
        )))
    }
}

/// Cast a column to f64 and collect it. Values that fail to cast are `None`.
pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + 719163).unwrap_or_default()
}

/// Convert a results DataFrame into typed rows.
///
/// Missing or non-numeric values are a contract violation and fail the
/// whole load, naming the offending row.
fn dataframe_to_results(df: &DataFrame) -> Result<DailyResults, LoaderError> {
    require_columns(df, EXPECTED_COLUMNS)?;

    let dates = parse_date_column(df, DATE_COLUMN)?;
    let bench_cf = float_column(df, BENCHMARK_CASHFLOW_COLUMN)?;
    let bench_pv = float_column(df, BENCHMARK_PORTFOLIO_COLUMN)?;
    let strat_cf = float_column(df, STRATEGY_CASHFLOW_COLUMN)?;
    let strat_pv = float_column(df, STRATEGY_PORTFOLIO_COLUMN)?;

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let date = dates[idx]
            .ok_or_else(|| LoaderError::InvalidData(format!("Row {}: unparseable {}", idx, DATE_COLUMN)))?;

        let money = |values: &[Option<f64>], column: &str| -> Result<Decimal, LoaderError> {
            values[idx]
                .and_then(Decimal::from_f64_retain)
                .ok_or_else(|| LoaderError::InvalidData(format!("Row {}: invalid {}", idx, column)))
        };

        rows.push(DailyResult {
            date,
            benchmark_cashflow: money(&bench_cf, BENCHMARK_CASHFLOW_COLUMN)?,
            benchmark_portfolio: money(&bench_pv, BENCHMARK_PORTFOLIO_COLUMN)?,
            strategy_cashflow: money(&strat_cf, STRATEGY_CASHFLOW_COLUMN)?,
            strategy_portfolio: money(&strat_pv, STRATEGY_PORTFOLIO_COLUMN)?,
        });
    }

    Ok(DailyResults::new(rows)?)
}
