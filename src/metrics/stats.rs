//! NaN-aware summary statistics over monthly series.

use statrs::statistics::Statistics;

/// Months per year, used for annualization.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Standard deviations at or below this are treated as zero volatility.
pub const ZERO_VOLATILITY_EPSILON: f64 = 1e-12;

fn finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values.into_iter().filter(|v| !v.is_nan()).collect()
}

/// Arithmetic mean, skipping NaN. `None` when nothing is left.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let values = finite(values);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Population standard deviation (ddof = 0), skipping NaN.
pub fn population_std_dev(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let values = finite(values);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().population_std_dev())
}

/// Annualized Sharpe ratio from monthly excess returns.
///
/// Zero or undefined volatility yields 0.
pub fn annualized_sharpe(excess_returns: impl IntoIterator<Item = f64>) -> f64 {
    let values = finite(excess_returns);
    let (Some(avg), Some(std_dev)) = (mean(values.iter().copied()), population_std_dev(values.iter().copied()))
    else {
        return 0.0;
    };

    if std_dev.is_nan() || std_dev <= ZERO_VOLATILITY_EPSILON {
        return 0.0;
    }

    avg / std_dev * MONTHS_PER_YEAR.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_nan() {
        assert_eq!(mean(vec![1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(mean(vec![f64::NAN]), None);
        assert_eq!(mean(Vec::new()), None);
    }

    #[test]
    fn test_population_std_dev() {
        // values 2, 4, 4, 4, 5, 5, 7, 9 have population std dev 2
        let sd = population_std_dev(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_constant_is_zero() {
        assert_eq!(annualized_sharpe(vec![-0.0016; 24]), 0.0);
        assert_eq!(annualized_sharpe(vec![0.1, 0.1, 0.1]), 0.0);
    }

    #[test]
    fn test_sharpe_empty_is_zero() {
        assert_eq!(annualized_sharpe(Vec::new()), 0.0);
        assert_eq!(annualized_sharpe(vec![f64::NAN, f64::NAN]), 0.0);
    }

    #[test]
    fn test_sharpe_value() {
        // mean 0.01, population std dev 0.01
        let sharpe = annualized_sharpe(vec![0.0, 0.02]);
        assert!((sharpe - 12.0_f64.sqrt()).abs() < 1e-9);
    }
}
