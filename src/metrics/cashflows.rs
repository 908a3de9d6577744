//! Monthly cashflow derivation.
//!
//! Turns the daily accumulated cashflow columns into one net cashflow per
//! calendar month. The last month of each series carries the terminal
//! portfolio value instead of a period flow, so the result can be fed
//! straight into an IRR solver.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::data::types::{month_start, DailyResult, DailyResults, MonthlySeries};

/// Fixed benchmark contribution per month.
pub const DEFAULT_MONTHLY_CONTRIBUTION: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Derive IRR-ready monthly cashflows with the default 200 contribution.
///
/// Returns `(benchmark, strategy)`.
pub fn calculate_cashflows(results: &DailyResults) -> (MonthlySeries<Decimal>, MonthlySeries<Decimal>) {
    calculate_cashflows_with(results, DEFAULT_MONTHLY_CONTRIBUTION)
}

/// Derive IRR-ready monthly cashflows for a given benchmark contribution.
///
/// For every month but the last, the benchmark flow is `-contribution` and
/// the strategy flow is the change in accumulated cashflow. The first
/// strategy flow is the raw accumulated level. The last entry of both is
/// the terminal portfolio value.
pub fn calculate_cashflows_with(
    results: &DailyResults,
    monthly_contribution: Decimal,
) -> (MonthlySeries<Decimal>, MonthlySeries<Decimal>) {
    let monthly = results.monthly();
    let n = monthly.len();
    let dates: Vec<_> = monthly.iter().map(|r| month_start(r.date)).collect();

    let mut benchmark = Vec::with_capacity(n);
    let mut strategy = Vec::with_capacity(n);

    for i in 0..n.saturating_sub(1) {
        benchmark.push(-monthly_contribution);
        strategy.push(strategy_period_cashflow(&monthly, i));
    }

    if let Some(last) = monthly.last() {
        benchmark.push(last.benchmark_portfolio);
        strategy.push(last.strategy_portfolio);
    }

    (
        MonthlySeries::new(dates.clone(), benchmark),
        MonthlySeries::new(dates, strategy),
    )
}

/// Net strategy cashflow for month `i` of a monthly reduction.
///
/// Month 0 has no prior accumulation to subtract and uses the level as is.
pub fn strategy_period_cashflow(monthly: &[DailyResult], i: usize) -> Decimal {
    if i == 0 {
        monthly[0].strategy_cashflow
    } else {
        monthly[i].strategy_cashflow - monthly[i - 1].strategy_cashflow
    }
}

/// Contributions fed to the return calculator, as f64.
///
/// The benchmark contributes the fixed amount every month. The strategy
/// contributes its negated IRR cashflows, terminal entry included, so the
/// last month's return counts the terminal value as a withdrawal.
/// Returns `(benchmark, strategy)`.
pub fn return_contributions(
    strategy_cashflows: &MonthlySeries<Decimal>,
    monthly_contribution: Decimal,
) -> (Vec<f64>, Vec<f64>) {
    let benchmark = vec![monthly_contribution.to_f64().unwrap_or(0.0); strategy_cashflows.len()];
    let strategy = strategy_cashflows
        .values()
        .iter()
        .map(|cf| (-*cf).to_f64().unwrap_or(0.0))
        .collect();
    (benchmark, strategy)
}
