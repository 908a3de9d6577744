//! Risk-free rate resolution.
//!
//! Supplies either a flat annual rate or a monthly history of 3-month
//! T-bill rates (FRED `TB3MS`), aligned later against monthly returns.

pub mod provider;

pub use provider::{
    get_risk_free_rate, load_tbill_rates, monthly_equivalent, MonthlyRates, RateLoadError,
    RateProvenance, RateSource, ResolvedRate, RiskFreeConfig,
};
