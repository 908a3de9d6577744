//! Monthly cashflow export.
//!
//! Writes the IRR-ready monthly cashflows of both plans next to their
//! portfolio values, one row per month.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;
use tracing::info;

use crate::metrics::{MonthlyRow, RiskAdjustedMetrics};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the monthly cashflow table.
pub fn monthly_cashflow_frame(metrics: &RiskAdjustedMetrics, rows: &[MonthlyRow]) -> Result<DataFrame, ExportError> {
    let to_f64 = |v: &rust_decimal::Decimal| v.to_f64().unwrap_or(f64::NAN);

    let dates: Vec<String> = rows.iter().map(|r| r.month.format("%Y-%m-%d").to_string()).collect();
    let benchmark_flows: Vec<f64> = metrics.benchmark.cashflows.values().iter().map(to_f64).collect();
    let benchmark_values: Vec<f64> = rows.iter().map(|r| to_f64(&r.benchmark_portfolio)).collect();
    let strategy_flows: Vec<f64> = metrics.strategy.cashflows.values().iter().map(to_f64).collect();
    let strategy_values: Vec<f64> = rows.iter().map(|r| to_f64(&r.strategy_portfolio)).collect();

    let df = df![
        "Date" => dates,
        "Benchmark_Monthly_Investment" => benchmark_flows,
        "Benchmark_Portfolio_Value" => benchmark_values,
        "Strategy_Monthly_Cashflow" => strategy_flows,
        "Strategy_Portfolio_Value" => strategy_values,
    ]?;
    Ok(df)
}

/// Write the monthly cashflow table to `path` as CSV.
pub fn export_monthly_cashflows(
    metrics: &RiskAdjustedMetrics,
    rows: &[MonthlyRow],
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut df = monthly_cashflow_frame(metrics, rows)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    info!("Monthly cashflow data saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{DailyResult, DailyResults};
    use crate::metrics::analyze_risk_adjusted_returns_default;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample() -> DailyResults {
        let d = |m| NaiveDate::from_ymd_opt(2021, m, 4).unwrap();
        DailyResults::new(vec![
            DailyResult::new(d(1), dec!(-200), dec!(200), dec!(-150), dec!(150)),
            DailyResult::new(d(2), dec!(-400), dec!(404), dec!(-250), dec!(255)),
            DailyResult::new(d(3), dec!(-600), dec!(610), dec!(-250), dec!(262)),
        ])
        .unwrap()
    }

    #[test]
    fn test_frame_columns() {
        let results = sample();
        let (metrics, rows) = analyze_risk_adjusted_returns_default(&results);
        let df = monthly_cashflow_frame(&metrics, &rows).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 5);
        let flows: Vec<Option<f64>> = df
            .column("Strategy_Monthly_Cashflow")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(flows, vec![Some(-150.0), Some(-100.0), Some(262.0)]);
    }

    #[test]
    fn test_export_writes_csv() {
        let results = sample();
        let (metrics, rows) = analyze_risk_adjusted_returns_default(&results);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cashflows.csv");

        export_monthly_cashflows(&metrics, &rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Benchmark_Monthly_Investment,Benchmark_Portfolio_Value,Strategy_Monthly_Cashflow,Strategy_Portfolio_Value")
        );
        assert!(lines.next().unwrap().starts_with("2021-01-01,-200"));
        assert_eq!(content.lines().count(), 4);
    }
}
