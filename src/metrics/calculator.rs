//! Risk-adjusted metrics calculator.
//!
//! Combines monthly cashflows, contribution-adjusted returns and the
//! risk-free rate into annualized mean return, volatility, Sharpe ratio
//! and IRR for the benchmark and the strategy.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::types::{month_start, DailyResults, MonthlySeries};
use crate::rates::{get_risk_free_rate, monthly_equivalent, RateProvenance, RateSource, ResolvedRate, RiskFreeConfig};

use super::cashflows::{calculate_cashflows_with, return_contributions, DEFAULT_MONTHLY_CONTRIBUTION};
use super::irr::{annualize_monthly_rate, irr};
use super::returns::calculate_monthly_returns;
use super::stats::{annualized_sharpe, mean, population_std_dev, MONTHS_PER_YEAR};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for a risk-adjusted analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fixed benchmark contribution per month.
    pub monthly_contribution: Decimal,

    /// Risk-free rate selection.
    pub risk_free: RiskFreeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            monthly_contribution: DEFAULT_MONTHLY_CONTRIBUTION,
            risk_free: RiskFreeConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Metrics for one of the two compared plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    /// Mean monthly return × 12.
    pub mean_return_annual: f64,
    /// Std dev of monthly returns × √12.
    pub std_dev_annual: f64,
    pub sharpe_ratio: f64,
    /// Annualized IRR, 0 when the solver failed.
    pub irr_annual: f64,
    /// Whether the IRR solver produced a rate.
    pub irr_solved: bool,

    /// IRR-ready cashflows (last entry is the terminal value).
    pub cashflows: MonthlySeries<Decimal>,
    /// Contribution-adjusted monthly returns.
    pub monthly_returns: MonthlySeries<f64>,
    /// Monthly return minus monthly risk-free rate; `None` where no rate.
    pub excess_returns: MonthlySeries<Option<f64>>,
}

/// Risk-adjusted comparison of benchmark and strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAdjustedMetrics {
    pub benchmark: StrategyMetrics,
    pub strategy: StrategyMetrics,

    /// Annual risk-free rate used for reporting: the constant, or the
    /// mean of the aligned historical rates.
    pub risk_free_rate_annual: f64,
    /// The resolved rate source.
    pub risk_free: RateSource,
    pub rate_provenance: RateProvenance,
    /// Annual risk-free rate aligned to each month.
    pub risk_free_rates: MonthlySeries<Option<f64>>,
    /// Monthly-equivalent risk-free rate per month.
    pub risk_free_rates_monthly: MonthlySeries<Option<f64>>,
}

impl RiskAdjustedMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Risk-Adjusted Metrics ({} months)\n\
             ====================================\n\
             \n\
             Risk-Free Rate (Annual): {:.2}% ({})\n\
             \n\
             {:<26}{:>12}{:>12}\n\
             {:<26}{:>11.2}%{:>11.2}%\n\
             {:<26}{:>11.2}%{:>11.2}%\n\
             {:<26}{:>12.3}{:>12.3}\n\
             {:<26}{:>11.2}%{:>11.2}%",
            self.benchmark.monthly_returns.len(),
            self.risk_free_rate_annual * 100.0,
            provenance_label(self.rate_provenance),
            "",
            "Benchmark",
            "Strategy",
            "Mean Return (Annual)",
            self.benchmark.mean_return_annual * 100.0,
            self.strategy.mean_return_annual * 100.0,
            "Std Dev (Annual)",
            self.benchmark.std_dev_annual * 100.0,
            self.strategy.std_dev_annual * 100.0,
            "Sharpe Ratio",
            self.benchmark.sharpe_ratio,
            self.strategy.sharpe_ratio,
            "IRR (Annual)",
            self.benchmark.irr_annual * 100.0,
            self.strategy.irr_annual * 100.0,
        )
    }
}

fn provenance_label(provenance: RateProvenance) -> &'static str {
    match provenance {
        RateProvenance::Configured => "flat",
        RateProvenance::Historical => "TB3MS",
        RateProvenance::Fallback => "flat fallback",
    }
}

/// One month of the annotated monthly table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    /// Month-start date.
    pub month: NaiveDate,
    /// Date of the observation representing the month.
    pub date: NaiveDate,
    pub benchmark_cashflow: Decimal,
    pub benchmark_portfolio: Decimal,
    pub strategy_cashflow: Decimal,
    pub strategy_portfolio: Decimal,
    pub benchmark_total_value: Decimal,
    pub strategy_total_value: Decimal,
    pub benchmark_return: f64,
    pub strategy_return: f64,
    pub risk_free_rate: Option<f64>,
    pub risk_free_rate_monthly: Option<f64>,
    pub benchmark_excess_return: Option<f64>,
    pub strategy_excess_return: Option<f64>,
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Analyze a results table, resolving the risk-free rate from `config`.
    pub fn calculate(results: &DailyResults, config: &AnalysisConfig) -> (RiskAdjustedMetrics, Vec<MonthlyRow>) {
        let rate = get_risk_free_rate(&config.risk_free);
        Self::calculate_with_rate(results, config.monthly_contribution, &rate)
    }

    /// Analyze a results table against an already resolved rate.
    pub fn calculate_with_rate(
        results: &DailyResults,
        monthly_contribution: Decimal,
        rate: &ResolvedRate,
    ) -> (RiskAdjustedMetrics, Vec<MonthlyRow>) {
        let (benchmark_cashflows, strategy_cashflows) = calculate_cashflows_with(results, monthly_contribution);

        let monthly = results.monthly();
        let months: Vec<NaiveDate> = monthly.iter().map(|r| month_start(r.date)).collect();

        let benchmark_values: Vec<f64> = monthly.iter().map(|r| to_f64(r.benchmark_total_value())).collect();
        let strategy_values: Vec<f64> = monthly.iter().map(|r| to_f64(r.strategy_total_value())).collect();

        let (benchmark_contributions, strategy_contributions) =
            return_contributions(&strategy_cashflows, monthly_contribution);
        let benchmark_returns = calculate_monthly_returns(&benchmark_values, &benchmark_contributions);
        let strategy_returns = calculate_monthly_returns(&strategy_values, &strategy_contributions);

        let (risk_free_rates, risk_free_rate_annual) = align_risk_free(&rate.source, &months);
        let risk_free_monthly: Vec<Option<f64>> =
            risk_free_rates.iter().map(|r| r.map(monthly_equivalent)).collect();

        let benchmark_excess = excess_returns(&benchmark_returns, &risk_free_monthly);
        let strategy_excess = excess_returns(&strategy_returns, &risk_free_monthly);

        let rows = monthly
            .iter()
            .enumerate()
            .map(|(i, r)| MonthlyRow {
                month: months[i],
                date: r.date,
                benchmark_cashflow: r.benchmark_cashflow,
                benchmark_portfolio: r.benchmark_portfolio,
                strategy_cashflow: r.strategy_cashflow,
                strategy_portfolio: r.strategy_portfolio,
                benchmark_total_value: r.benchmark_total_value(),
                strategy_total_value: r.strategy_total_value(),
                benchmark_return: benchmark_returns[i],
                strategy_return: strategy_returns[i],
                risk_free_rate: risk_free_rates[i],
                risk_free_rate_monthly: risk_free_monthly[i],
                benchmark_excess_return: benchmark_excess[i],
                strategy_excess_return: strategy_excess[i],
            })
            .collect();

        let benchmark = Self::strategy_metrics("benchmark", &months, benchmark_cashflows, benchmark_returns, benchmark_excess);
        let strategy = Self::strategy_metrics("strategy", &months, strategy_cashflows, strategy_returns, strategy_excess);

        let metrics = RiskAdjustedMetrics {
            benchmark,
            strategy,
            risk_free_rate_annual,
            risk_free: rate.source.clone(),
            rate_provenance: rate.provenance,
            risk_free_rates: MonthlySeries::new(months.clone(), risk_free_rates),
            risk_free_rates_monthly: MonthlySeries::new(months, risk_free_monthly),
        };

        (metrics, rows)
    }

    fn strategy_metrics(
        label: &str,
        months: &[NaiveDate],
        cashflows: MonthlySeries<Decimal>,
        returns: Vec<f64>,
        excess: Vec<Option<f64>>,
    ) -> StrategyMetrics {
        let mean_return_annual = mean(returns.iter().copied()).unwrap_or(0.0) * MONTHS_PER_YEAR;
        let std_dev_annual = population_std_dev(returns.iter().copied()).unwrap_or(0.0) * MONTHS_PER_YEAR.sqrt();
        let sharpe_ratio = annualized_sharpe(excess.iter().flatten().copied());

        let flows: Vec<f64> = cashflows.values().iter().map(|cf| to_f64(*cf)).collect();
        let (irr_annual, irr_solved) = match irr(&flows) {
            Ok(monthly_irr) => (annualize_monthly_rate(monthly_irr), true),
            Err(e) => {
                warn!("{} IRR unavailable ({}); reporting 0", label, e);
                (0.0, false)
            }
        };

        debug!(
            "{}: mean {:.4}, std {:.4}, sharpe {:.3}, irr {:.4}",
            label, mean_return_annual, std_dev_annual, sharpe_ratio, irr_annual
        );

        StrategyMetrics {
            mean_return_annual,
            std_dev_annual,
            sharpe_ratio,
            irr_annual,
            irr_solved,
            cashflows,
            monthly_returns: MonthlySeries::new(months.to_vec(), returns),
            excess_returns: MonthlySeries::new(months.to_vec(), excess),
        }
    }
}

/// Analyze risk-adjusted returns of benchmark and strategy.
///
/// Returns the metrics record and the annotated monthly table.
pub fn analyze_risk_adjusted_returns(
    results: &DailyResults,
    config: &AnalysisConfig,
) -> (RiskAdjustedMetrics, Vec<MonthlyRow>) {
    MetricsCalculator::calculate(results, config)
}

/// [`analyze_risk_adjusted_returns`] with the default configuration
/// (flat 2% risk-free rate, 200 monthly contribution).
pub fn analyze_risk_adjusted_returns_default(results: &DailyResults) -> (RiskAdjustedMetrics, Vec<MonthlyRow>) {
    analyze_risk_adjusted_returns(results, &AnalysisConfig::default())
}

/// Align the rate source to `months`, returning the per-month annual
/// rate and the annual rate to report.
fn align_risk_free(source: &RateSource, months: &[NaiveDate]) -> (Vec<Option<f64>>, f64) {
    match source {
        RateSource::Constant(rate) => (vec![Some(*rate); months.len()], *rate),
        RateSource::Series(rates) => {
            let aligned: Vec<Option<f64>> = months.iter().map(|m| rates.aligned(*m)).collect();
            let reported = mean(aligned.iter().flatten().copied()).unwrap_or_else(|| {
                warn!(
                    "No risk-free rate covers {} to {} (rates start {}); Sharpe ratios will be 0",
                    months.first().map(|m| m.to_string()).unwrap_or_default(),
                    months.last().map(|m| m.to_string()).unwrap_or_default(),
                    rates.first_date()
                );
                f64::NAN
            });
            (aligned, reported)
        }
    }
}

fn excess_returns(returns: &[f64], risk_free_monthly: &[Option<f64>]) -> Vec<Option<f64>> {
    returns
        .iter()
        .zip(risk_free_monthly)
        .map(|(r, rf)| rf.map(|rf| r - rf))
        .collect()
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::types::DailyResult;
    use crate::rates::MonthlyRates;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Benchmark invests 200 on the first trading day of each month into an
    /// asset growing 1% a month; the strategy holds a flat 1000.
    fn sample_results(months: u32) -> DailyResults {
        sample_results_with(months, dec!(-1000), dec!(1000))
    }

    /// Same benchmark, with a strategy frozen at the given accumulated
    /// cashflow and portfolio value.
    fn sample_results_with(months: u32, strategy_cf: Decimal, strategy_pv: Decimal) -> DailyResults {
        let mut rows = Vec::new();
        let mut bench_value = 0.0_f64;
        for i in 0..months {
            let year = 2020 + (i / 12) as i32;
            let month = i % 12 + 1;
            bench_value = bench_value * 1.01 + 200.0;
            let bench_cf = -200 * (i as i64 + 1);
            for day in [2, 15] {
                rows.push(DailyResult::new(
                    d(year, month, day),
                    Decimal::from(bench_cf),
                    Decimal::from_f64_retain(bench_value).unwrap(),
                    strategy_cf,
                    strategy_pv,
                ));
            }
        }
        DailyResults::new(rows).unwrap()
    }

    fn flat(rate: f64) -> ResolvedRate {
        ResolvedRate {
            source: RateSource::Constant(rate),
            provenance: RateProvenance::Configured,
        }
    }

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.monthly_contribution, dec!(200));
        assert_eq!(config.risk_free.flat_rate, 0.02);
        assert!(!config.risk_free.use_historical_rates);
    }

    #[test]
    fn test_config_from_toml() {
        let config = AnalysisConfig::from_toml_str(
            "monthly_contribution = 500\n\
             [risk_free]\n\
             use_historical_rates = true\n\
             rates_path = \"data/TB3MS.csv\"\n",
        )
        .unwrap();
        assert_eq!(config.monthly_contribution, dec!(500));
        assert!(config.risk_free.use_historical_rates);
        assert_eq!(config.risk_free.flat_rate, 0.02);
        assert_eq!(config.risk_free.rates_path, PathBuf::from("data/TB3MS.csv"));
    }

    #[test]
    fn test_series_lengths() {
        let results = sample_results(12);
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.02));

        assert_eq!(rows.len(), 12);
        assert_eq!(metrics.benchmark.cashflows.len(), 12);
        assert_eq!(metrics.strategy.monthly_returns.len(), 12);
        assert_eq!(metrics.benchmark.monthly_returns.values()[0], 0.0);
        assert_eq!(metrics.risk_free_rates_monthly.len(), 12);
        assert_eq!(rows[0].month, d(2020, 1, 1));
        assert_eq!(rows[0].date, d(2020, 1, 2));
    }

    #[test]
    fn test_benchmark_returns_exclude_contributions() {
        let results = sample_results(6);
        let (metrics, _) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.0));

        for r in &metrics.benchmark.monthly_returns.values()[1..] {
            assert!((r - 0.01).abs() < 1e-9, "return {}", r);
        }
        assert!((metrics.benchmark.mean_return_annual - 0.01 * 5.0 / 6.0 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_excess_gives_zero_sharpe() {
        // A strategy that never invests has no value: every return is 0
        // and the excess return is constant.
        let results = sample_results_with(24, dec!(0), dec!(0));
        let (metrics, _) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.02));

        assert!(metrics.strategy.monthly_returns.values().iter().all(|r| *r == 0.0));
        assert_eq!(metrics.strategy.sharpe_ratio, 0.0);
        assert_eq!(metrics.strategy.std_dev_annual, 0.0);
    }

    #[test]
    fn test_strategy_returns_use_cashflow_series() {
        // One row per month; accumulated cashflow falls as the strategy buys.
        let rows = vec![
            DailyResult::new(d(2020, 1, 2), dec!(-200), dec!(200), dec!(-100), dec!(1000)),
            DailyResult::new(d(2020, 2, 3), dec!(-400), dec!(400), dec!(-150), dec!(1100)),
            DailyResult::new(d(2020, 3, 2), dec!(-600), dec!(600), dec!(-200), dec!(1300)),
        ];
        let results = DailyResults::new(rows).unwrap();
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.0));

        // Month 2: (1100 - 1000 - 50) / 1000. Month 3 adds back the
        // terminal value: (1300 - 1100 + 1300) / 1100.
        let returns = metrics.strategy.monthly_returns.values();
        let expected = [0.0, 0.05, 1500.0 / 1100.0];
        assert_eq!(returns.len(), expected.len());
        for (got, want) in returns.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {}, want {}", got, want);
        }
        assert_eq!(rows[2].strategy_return, returns[2]);
        assert!((metrics.strategy.mean_return_annual - (0.05 + 1500.0 / 1100.0) / 3.0 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_strategy_returns_count_cash_from_sales() {
        // Month 3 the strategy has sold: accumulated cashflow turns
        // positive and the 50 of cash counts toward total value.
        let rows = vec![
            DailyResult::new(d(2020, 1, 2), dec!(-200), dec!(200), dec!(-100), dec!(100)),
            DailyResult::new(d(2020, 2, 3), dec!(-400), dec!(400), dec!(-150), dec!(160)),
            DailyResult::new(d(2020, 3, 2), dec!(-600), dec!(600), dec!(50), dec!(90)),
        ];
        let results = DailyResults::new(rows).unwrap();
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.0));

        assert_eq!(rows[2].strategy_total_value, dec!(140));
        assert_eq!(metrics.strategy.cashflows.values(), vec![dec!(-100), dec!(-50), dec!(90)]);

        // (160 - 100 - 50) / 100, then (140 - 160 + 90) / 160
        let returns = metrics.strategy.monthly_returns.values();
        assert_eq!(returns[0], 0.0);
        assert!((returns[1] - 0.1).abs() < 1e-12);
        assert!((returns[2] - 0.4375).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlapping_rates_reports_nan() {
        let results = sample_results(3);
        let rates = MonthlyRates::from_observations(vec![(d(2030, 1, 1), 0.03)]).unwrap();
        let rate = ResolvedRate {
            source: RateSource::Series(rates),
            provenance: RateProvenance::Historical,
        };
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &rate);

        assert!(metrics.risk_free_rate_annual.is_nan());
        assert!(rows.iter().all(|r| r.strategy_excess_return.is_none()));
        assert_eq!(metrics.benchmark.sharpe_ratio, 0.0);
        assert_eq!(metrics.strategy.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_irr_positive_for_growing_benchmark() {
        let results = sample_results(24);
        let (metrics, _) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.02));

        assert!(metrics.benchmark.irr_solved);
        assert!(metrics.benchmark.irr_annual > 0.0);
    }

    #[test]
    fn test_irr_failure_reported_as_zero() {
        // A strategy that never invests has all-zero cashflows.
        let rows = vec![
            DailyResult::new(d(2020, 1, 2), dec!(-200), dec!(200), dec!(0), dec!(0)),
            DailyResult::new(d(2020, 2, 3), dec!(-400), dec!(402), dec!(0), dec!(0)),
        ];
        let results = DailyResults::new(rows).unwrap();
        let (metrics, _) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.02));

        assert!(!metrics.strategy.irr_solved);
        assert_eq!(metrics.strategy.irr_annual, 0.0);
        assert!(metrics.benchmark.irr_solved);
    }

    #[test]
    fn test_constant_rate_applied_uniformly() {
        let results = sample_results(3);
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &flat(0.05));

        let expected = monthly_equivalent(0.05);
        assert_eq!(metrics.risk_free_rate_annual, 0.05);
        assert!(rows.iter().all(|r| r.risk_free_rate == Some(0.05)));
        assert!(rows.iter().all(|r| r.risk_free_rate_monthly == Some(expected)));
        assert_eq!(rows[1].strategy_excess_return, Some(0.0 - expected));
    }

    #[test]
    fn test_historical_rates_forward_filled() {
        let results = sample_results(4);
        let rates = MonthlyRates::from_observations(vec![(d(2020, 2, 1), 0.012), (d(2020, 3, 1), 0.024)]).unwrap();
        let rate = ResolvedRate {
            source: RateSource::Series(rates),
            provenance: RateProvenance::Historical,
        };
        let (metrics, rows) = MetricsCalculator::calculate_with_rate(&results, dec!(200), &rate);

        let aligned: Vec<_> = rows.iter().map(|r| r.risk_free_rate).collect();
        assert_eq!(aligned, vec![None, Some(0.012), Some(0.024), Some(0.024)]);
        assert_eq!(rows[0].benchmark_excess_return, None);
        assert!((metrics.risk_free_rate_annual - 0.02).abs() < 1e-12);
        assert_eq!(metrics.rate_provenance, RateProvenance::Historical);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let results = sample_results(18);
        let first = analyze_risk_adjusted_returns_default(&results);
        let second = analyze_risk_adjusted_returns_default(&results);
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_mentions_metrics() {
        let results = sample_results(12);
        let (metrics, _) = analyze_risk_adjusted_returns_default(&results);
        let summary = metrics.summary();
        assert!(summary.contains("Sharpe Ratio"));
        assert!(summary.contains("IRR (Annual)"));
        assert!(summary.contains("flat"));
    }
}
