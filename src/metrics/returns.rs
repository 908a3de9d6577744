//! Contribution-adjusted monthly returns.
//!
//! `(end - start - contribution) / start`: capital added during the month
//! is removed so only investment performance is measured.

use crate::data::types::MonthlySeries;

/// Monthly returns net of new contributions.
///
/// The first entry is 0. A period whose starting value is not positive
/// also returns 0. Contributions beyond the end of `contributions` count
/// as 0.
pub fn calculate_monthly_returns(portfolio_values: &[f64], contributions: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(portfolio_values.len());
    if portfolio_values.is_empty() {
        return returns;
    }

    returns.push(0.0);
    for i in 1..portfolio_values.len() {
        let start = portfolio_values[i - 1];
        let end = portfolio_values[i];
        let contribution = contributions.get(i).copied().unwrap_or(0.0);

        if start > 0.0 {
            returns.push((end - start - contribution) / start);
        } else {
            returns.push(0.0);
        }
    }
    returns
}

/// [`calculate_monthly_returns`] keeping the month index of `portfolio_values`.
pub fn calculate_monthly_return_series(
    portfolio_values: &MonthlySeries<f64>,
    contributions: &[f64],
) -> MonthlySeries<f64> {
    MonthlySeries::new(
        portfolio_values.dates().to_vec(),
        calculate_monthly_returns(portfolio_values.values(), contributions),
    )
}
