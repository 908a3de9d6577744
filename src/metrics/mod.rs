//! Performance metrics module.
//!
//! Provides the risk-adjusted comparison of benchmark and strategy:
//! - Monthly cashflows (IRR-ready, terminal value last)
//! - Contribution-adjusted monthly returns
//! - Sharpe ratio against a flat or historical risk-free rate
//! - IRR, annualized
//! - Drawdown on total value

pub mod calculator;
pub mod cashflows;
pub mod drawdown;
pub mod irr;
pub mod returns;
pub mod stats;

pub use calculator::{
    analyze_risk_adjusted_returns, analyze_risk_adjusted_returns_default, AnalysisConfig, ConfigError,
    MetricsCalculator, MonthlyRow, RiskAdjustedMetrics, StrategyMetrics,
};
pub use cashflows::{calculate_cashflows, calculate_cashflows_with, DEFAULT_MONTHLY_CONTRIBUTION};
pub use drawdown::{analyze_drawdown, benchmark_drawdown, strategy_drawdown, DrawdownAnalysis};
pub use irr::{annualize_monthly_rate, irr, IrrError};
pub use returns::{calculate_monthly_return_series, calculate_monthly_returns};
