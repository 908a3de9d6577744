//! Internal Rate of Return for periodic cashflows.
//!
//! Newton-Raphson from a small positive guess, falling back to bisection
//! over a bracketing interval when Newton diverges or stalls.

use thiserror::Error;

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-10;

/// Candidate rates scanned for a sign change, ordered outward from zero.
const BRACKET_GRID: &[f64] = &[
    0.0, 0.001, -0.001, 0.01, -0.01, 0.05, -0.05, 0.1, -0.1, 0.25, -0.25, 0.5, -0.5, 1.0, -0.75,
    2.0, -0.9, 5.0, -0.99, 10.0,
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrrError {
    #[error("No cashflows")]
    Empty,

    #[error("Cashflows have no sign change")]
    NoSignChange,

    #[error("IRR solver did not converge")]
    NoConvergence,
}

/// Periodic IRR of `cashflows`, where `cashflows[t]` occurs at period `t`.
pub fn irr(cashflows: &[f64]) -> Result<f64, IrrError> {
    if cashflows.is_empty() {
        return Err(IrrError::Empty);
    }

    let has_positive = cashflows.iter().any(|&cf| cf > 0.0);
    let has_negative = cashflows.iter().any(|&cf| cf < 0.0);
    if !has_positive || !has_negative {
        return Err(IrrError::NoSignChange);
    }

    if let Some(rate) = newton_raphson(cashflows, 0.01) {
        return Ok(rate);
    }

    bisection(cashflows)
}

/// Convert a monthly rate to an annual rate by compounding.
pub fn annualize_monthly_rate(monthly_rate: f64) -> f64 {
    (1.0 + monthly_rate).powi(12) - 1.0
}

/// Net present value and its derivative with respect to the rate.
fn npv_and_derivative(cashflows: &[f64], rate: f64) -> (f64, f64) {
    let factor = 1.0 + rate;
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (t, cf) in cashflows.iter().enumerate() {
        let discount = factor.powi(t as i32);
        npv += cf / discount;
        dnpv -= t as f64 * cf / (discount * factor);
    }
    (npv, dnpv)
}

fn npv(cashflows: &[f64], rate: f64) -> f64 {
    npv_and_derivative(cashflows, rate).0
}

fn newton_raphson(cashflows: &[f64], guess: f64) -> Option<f64> {
    let mut rate = guess;
    for _ in 0..MAX_ITERATIONS {
        let (value, derivative) = npv_and_derivative(cashflows, rate);
        if !value.is_finite() || !derivative.is_finite() || derivative.abs() < 1e-20 {
            return None;
        }

        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }

        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisection(cashflows: &[f64]) -> Result<f64, IrrError> {
    let mut sorted: Vec<f64> = BRACKET_GRID.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    // Prefer the bracket closest to zero.
    let mut brackets: Vec<(f64, f64)> = sorted
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|&(lo, hi)| {
            let (f_lo, f_hi) = (npv(cashflows, lo), npv(cashflows, hi));
            f_lo.is_finite() && f_hi.is_finite() && f_lo.signum() != f_hi.signum()
        })
        .collect();
    brackets.sort_by(|a, b| (a.0.abs().min(a.1.abs())).total_cmp(&b.0.abs().min(b.1.abs())));

    let (mut lo, mut hi) = *brackets.first().ok_or(IrrError::NoConvergence)?;
    let mut f_lo = npv(cashflows, lo);

    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv(cashflows, mid);
        if f_mid == 0.0 || (hi - lo) / 2.0 < TOLERANCE {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(IrrError::NoConvergence)
}
