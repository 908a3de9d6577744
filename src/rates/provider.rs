//! Risk-free rate provider.
//!
//! The rate source is chosen by an explicit [`RiskFreeConfig`]. In
//! historical mode a FRED `TB3MS` export is read; any failure there is
//! logged and replaced by the flat rate, and the returned
//! [`RateProvenance`] records which path was taken.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::data::loader::{float_column, parse_date_column, read_csv, require_columns, LoaderError};
use crate::data::types::{is_month_start, month_from_ordinal, month_ordinal};

/// Default flat annual risk-free rate (2%).
pub const DEFAULT_FLAT_RATE: f64 = 0.02;

/// Default location of the T-bill history.
pub const DEFAULT_RATES_FILE: &str = "TB3MS.csv";

pub const OBSERVATION_DATE_COLUMN: &str = "observation_date";
pub const TB3MS_COLUMN: &str = "TB3MS";

#[derive(Error, Debug)]
pub enum RateLoadError {
    #[error("Failed to read rate file: {0}")]
    Loader(#[from] LoaderError),

    #[error("Duplicate observation date: {0}")]
    DuplicateDate(NaiveDate),

    #[error("No month-start observations in rate file")]
    Empty,
}

/// Configuration for risk-free rate resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFreeConfig {
    /// Use the T-bill history instead of the flat rate.
    pub use_historical_rates: bool,

    /// Flat annual rate, also the fallback when the history can't be read.
    pub flat_rate: f64,

    /// Path to the `TB3MS` CSV.
    pub rates_path: PathBuf,
}

impl Default for RiskFreeConfig {
    fn default() -> Self {
        Self {
            use_historical_rates: false,
            flat_rate: DEFAULT_FLAT_RATE,
            rates_path: PathBuf::from(DEFAULT_RATES_FILE),
        }
    }
}

/// Annual risk-free rates on a dense month-start grid.
///
/// Months inside the covered range with no usable observation hold `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRates {
    start: NaiveDate,
    values: Vec<Option<f64>>,
}

impl MonthlyRates {
    /// Build from dated annual rates (decimal). Dates that are not a
    /// month start are dropped; NaN rates become gaps.
    pub fn from_observations(
        observations: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, RateLoadError> {
        let mut observations: Vec<_> = observations.into_iter().collect();
        observations.sort_by_key(|(date, _)| *date);

        if let Some(w) = observations.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RateLoadError::DuplicateDate(w[0].0));
        }

        let on_grid: Vec<_> = observations
            .into_iter()
            .filter(|(date, _)| is_month_start(*date))
            .collect();

        let (first, last) = match (on_grid.first(), on_grid.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => return Err(RateLoadError::Empty),
        };

        let start_ordinal = month_ordinal(first);
        let len = (month_ordinal(last) - start_ordinal + 1) as usize;
        let mut values = vec![None; len];
        for (date, rate) in on_grid {
            if !rate.is_nan() {
                values[(month_ordinal(date) - start_ordinal) as usize] = Some(rate);
            }
        }

        Ok(Self {
            start: first,
            values,
        })
    }

    /// Number of months on the grid.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.start
    }

    pub fn last_date(&self) -> NaiveDate {
        month_from_ordinal(month_ordinal(self.start) + self.values.len() as i32 - 1).unwrap_or(self.start)
    }

    /// Rate recorded for exactly this month, if any.
    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        let offset = month_ordinal(month) - month_ordinal(self.start);
        if offset < 0 {
            return None;
        }
        self.values.get(offset as usize).copied().flatten()
    }

    /// Forward-filled lookup: the grid slot at or before `date`.
    ///
    /// Dates past the end carry the last slot forward; dates before the
    /// first observation have no rate. A gap slot stays a gap.
    pub fn aligned(&self, date: NaiveDate) -> Option<f64> {
        let offset = month_ordinal(date) - month_ordinal(self.start);
        if offset < 0 || self.values.is_empty() {
            return None;
        }
        let idx = (offset as usize).min(self.values.len() - 1);
        self.values[idx]
    }

    /// Mean of the recorded rates, ignoring gaps.
    pub fn mean(&self) -> Option<f64> {
        crate::metrics::stats::mean(self.values.iter().flatten().copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        let start = month_ordinal(self.start);
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, v)| month_from_ordinal(start + i as i32).map(|d| (d, *v)))
    }
}

/// Where a risk-free rate comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RateSource {
    /// One annual rate applied to every month.
    Constant(f64),
    /// Dated monthly annual rates.
    Series(MonthlyRates),
}

/// How the rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateProvenance {
    /// Flat rate selected by configuration.
    Configured,
    /// Historical file data.
    Historical,
    /// Historical mode requested but the file could not be used.
    Fallback,
}

/// A rate source with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub source: RateSource,
    pub provenance: RateProvenance,
}

impl ResolvedRate {
    pub fn is_fallback(&self) -> bool {
        self.provenance == RateProvenance::Fallback
    }
}

/// Convert an annual rate to its compounded monthly equivalent.
pub fn monthly_equivalent(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Resolve the risk-free rate. Never fails: load errors fall back to
/// the configured flat rate.
pub fn get_risk_free_rate(config: &RiskFreeConfig) -> ResolvedRate {
    if !config.use_historical_rates {
        info!(
            "Using flat {:.1}% annual risk-free rate as configured",
            config.flat_rate * 100.0
        );
        return ResolvedRate {
            source: RateSource::Constant(config.flat_rate),
            provenance: RateProvenance::Configured,
        };
    }

    match load_tbill_rates(&config.rates_path) {
        Ok(rates) => {
            info!(
                "Loaded {} months of risk-free rate data ({} to {})",
                rates.len(),
                rates.first_date(),
                rates.last_date()
            );
            if let Some(avg) = rates.mean() {
                info!("Average rate: {:.4} ({:.2}%)", avg, avg * 100.0);
            }
            ResolvedRate {
                source: RateSource::Series(rates),
                provenance: RateProvenance::Historical,
            }
        }
        Err(e) => {
            warn!(
                "Could not load T-bill data from {}: {}; using {:.1}% flat rate",
                config.rates_path.display(),
                e,
                config.flat_rate * 100.0
            );
            ResolvedRate {
                source: RateSource::Constant(config.flat_rate),
                provenance: RateProvenance::Fallback,
            }
        }
    }
}

/// Load a FRED `TB3MS` CSV. Rates are in percent and are converted to
/// decimals.
pub fn load_tbill_rates(path: &Path) -> Result<MonthlyRates, RateLoadError> {
    let df = read_csv(path)?;
    require_columns(&df, &[OBSERVATION_DATE_COLUMN, TB3MS_COLUMN])?;

    let dates = parse_date_column(&df, OBSERVATION_DATE_COLUMN)?;
    let rates = float_column(&df, TB3MS_COLUMN)?;

    let mut observations = Vec::with_capacity(dates.len());
    for (idx, (date, rate)) in dates.into_iter().zip(rates).enumerate() {
        let date = date.ok_or_else(|| {
            LoaderError::InvalidData(format!("Row {}: unparseable {}", idx, OBSERVATION_DATE_COLUMN))
        })?;
        observations.push((date, rate.map(|pct| pct / 100.0).unwrap_or(f64::NAN)));
    }

    MonthlyRates::from_observations(observations)
}
