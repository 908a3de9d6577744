//! Integrity checks for daily results tables.
//!
//! Validates:
//! - Month coverage (every calendar month between first and last row)
//! - Enough months to compute returns
//! - Portfolio values finite and non-negative
//! - Benchmark accumulated cashflow never rises (contributions only)

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::data::types::{month_from_ordinal, month_ordinal, DailyResults};
use crate::data::{LoaderError, ResultsLoader};

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Integrity report for one results table.
#[derive(Debug)]
pub struct IntegrityReport {
    pub row_count: usize,
    pub month_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} to {} ({} rows, {} months): {}/{} checks passed",
            self.first_date,
            self.last_date,
            self.row_count,
            self.month_count,
            passed,
            self.checks.len()
        )
    }
}

/// Validator for daily results tables.
pub struct ResultsIntegrityValidator;

impl ResultsIntegrityValidator {
    /// Run all checks on a loaded table.
    pub fn validate(results: &DailyResults) -> IntegrityReport {
        let checks = vec![
            Self::check_month_coverage(results),
            Self::check_minimum_months(results),
            Self::check_portfolio_values(results),
            Self::check_benchmark_contributions(results),
        ];

        IntegrityReport {
            row_count: results.len(),
            month_count: results.month_count(),
            first_date: results.first_date(),
            last_date: results.last_date(),
            checks,
        }
    }

    /// Load a results CSV and validate it.
    pub fn validate_file(path: impl AsRef<Path>) -> Result<IntegrityReport, LoaderError> {
        let results = ResultsLoader::new(path).load()?;
        Ok(Self::validate(&results))
    }

    /// Every calendar month in the covered range has at least one row.
    fn check_month_coverage(results: &DailyResults) -> CheckResult {
        let first = month_ordinal(results.first_date());
        let last = month_ordinal(results.last_date());
        let present: Vec<i32> = results.monthly().iter().map(|r| month_ordinal(r.date)).collect();

        let missing: Vec<String> = (first..=last)
            .filter(|m| present.binary_search(m).is_err())
            .filter_map(month_from_ordinal)
            .map(|d| d.format("%Y-%m").to_string())
            .collect();

        if missing.is_empty() {
            CheckResult::pass(
                "month_coverage",
                &format!("{} consecutive months", last - first + 1),
            )
        } else {
            CheckResult::fail(
                "month_coverage",
                &format!("{} months without observations", missing.len()),
                Some(missing.join(", ")),
            )
        }
    }

    /// Returns need at least two months.
    fn check_minimum_months(results: &DailyResults) -> CheckResult {
        let months = results.month_count();
        if months >= 2 {
            CheckResult::pass("minimum_months", &format!("{} months available", months))
        } else {
            CheckResult::fail(
                "minimum_months",
                "Fewer than 2 months; returns and Sharpe are degenerate",
                None,
            )
        }
    }

    /// Portfolio values should never be negative.
    fn check_portfolio_values(results: &DailyResults) -> CheckResult {
        let bad: Vec<String> = results
            .rows()
            .iter()
            .filter(|r| r.benchmark_portfolio < Decimal::ZERO || r.strategy_portfolio < Decimal::ZERO)
            .take(10)
            .map(|r| r.date.to_string())
            .collect();

        if bad.is_empty() {
            CheckResult::pass("portfolio_values", "All portfolio values non-negative")
        } else {
            CheckResult::fail(
                "portfolio_values",
                "Negative portfolio values found",
                Some(format!("First dates: {}", bad.join(", "))),
            )
        }
    }

    /// The benchmark only contributes, so its accumulated cashflow can't rise.
    fn check_benchmark_contributions(results: &DailyResults) -> CheckResult {
        let violations: Vec<String> = results
            .rows()
            .windows(2)
            .filter(|w| w[1].benchmark_cashflow > w[0].benchmark_cashflow)
            .take(10)
            .map(|w| w[1].date.to_string())
            .collect();

        if violations.is_empty() {
            CheckResult::pass(
                "benchmark_contributions",
                "Benchmark accumulated cashflow is non-increasing",
            )
        } else {
            CheckResult::fail(
                "benchmark_contributions",
                "Benchmark accumulated cashflow increases",
                Some(format!("First dates: {}", violations.join(", "))),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::DailyResult;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(date: NaiveDate, bench_cf: Decimal, pv: Decimal) -> DailyResult {
        DailyResult::new(date, bench_cf, pv, dec!(-100), pv)
    }

    #[test]
    fn test_check_result() {
        let pass = CheckResult::pass("test", "passed");
        assert!(pass.passed);

        let fail = CheckResult::fail("test", "failed", Some("details".to_string()));
        assert!(!fail.passed);
        assert_eq!(fail.details, Some("details".to_string()));
    }

    #[test]
    fn test_clean_table_passes() {
        let results = DailyResults::new(vec![
            row(d(2020, 11, 2), dec!(-200), dec!(200)),
            row(d(2020, 12, 1), dec!(-400), dec!(410)),
            row(d(2021, 1, 4), dec!(-600), dec!(615)),
        ])
        .unwrap();

        let report = ResultsIntegrityValidator::validate(&results);
        assert!(report.all_passed(), "{:?}", report.failed_checks());
        assert_eq!(report.month_count, 3);
        assert!(report.summary().contains("4/4 checks passed"));
    }

    #[test]
    fn test_missing_month_detected() {
        let results = DailyResults::new(vec![
            row(d(2020, 1, 2), dec!(-200), dec!(200)),
            row(d(2020, 3, 2), dec!(-400), dec!(400)),
        ])
        .unwrap();

        let report = ResultsIntegrityValidator::validate(&results);
        let failed = report.failed_checks();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "month_coverage");
        assert_eq!(failed[0].details.as_deref(), Some("2020-02"));
    }

    #[test]
    fn test_negative_value_and_rising_benchmark() {
        let results = DailyResults::new(vec![
            row(d(2020, 1, 2), dec!(-400), dec!(200)),
            row(d(2020, 2, 3), dec!(-200), dec!(-5)),
        ])
        .unwrap();

        let report = ResultsIntegrityValidator::validate(&results);
        let names: Vec<_> = report.failed_checks().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["portfolio_values", "benchmark_contributions"]);
    }

    #[test]
    fn test_single_month_flagged() {
        let results = DailyResults::new(vec![row(d(2020, 1, 2), dec!(-200), dec!(200))]).unwrap();
        let report = ResultsIntegrityValidator::validate(&results);
        assert!(!report.all_passed());
        assert_eq!(report.failed_checks()[0].name, "minimum_months");
    }
}
