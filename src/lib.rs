pub mod data;
pub mod metrics;
pub mod rates;
pub mod validation;

// Re-export commonly used types
pub use data::{DailyResult, DailyResults, MonthlySeries, ResultsLoader};
pub use metrics::{
    analyze_risk_adjusted_returns, calculate_cashflows, calculate_monthly_returns, AnalysisConfig,
    MetricsCalculator, MonthlyRow, RiskAdjustedMetrics, StrategyMetrics,
};
pub use rates::{get_risk_free_rate, RateProvenance, RateSource, ResolvedRate, RiskFreeConfig};
pub use validation::ResultsIntegrityValidator;
