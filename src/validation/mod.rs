//! Validation of daily results tables before analysis.

pub mod results_integrity;

pub use results_integrity::{CheckResult, IntegrityReport, ResultsIntegrityValidator};
