//! Core data types for contribution-based strategy analysis.
//!
//! A simulation run produces one [`DailyResult`] per trading day holding
//! the *accumulated* cashflow and the portfolio value of both the
//! benchmark (plain DCA) and the strategy. Everything downstream works on
//! monthly reductions of that table.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest money magnitude accepted in a results table (1e18).
///
/// Sums and differences of two in-range values stay far inside
/// `Decimal`'s range, so month-over-month arithmetic can't overflow.
pub const MAX_MONEY_MAGNITUDE: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Results table is empty")]
    Empty,

    #[error("{date}: {field} magnitude exceeds {max}")]
    OutOfRange {
        date: NaiveDate,
        field: &'static str,
        max: Decimal,
    },

    #[error("Series length mismatch: {dates} dates, {values} values")]
    LengthMismatch { dates: usize, values: usize },
}

/// One day of simulation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyResult {
    /// Observation date.
    pub date: NaiveDate,

    /// Accumulated benchmark cashflow (contributions are negative).
    pub benchmark_cashflow: Decimal,

    /// Benchmark portfolio market value.
    pub benchmark_portfolio: Decimal,

    /// Accumulated strategy cashflow (buys negative, sales positive).
    pub strategy_cashflow: Decimal,

    /// Strategy portfolio market value.
    pub strategy_portfolio: Decimal,
}

impl DailyResult {
    pub fn new(
        date: NaiveDate,
        benchmark_cashflow: Decimal,
        benchmark_portfolio: Decimal,
        strategy_cashflow: Decimal,
        strategy_portfolio: Decimal,
    ) -> Self {
        Self {
            date,
            benchmark_cashflow,
            benchmark_portfolio,
            strategy_cashflow,
            strategy_portfolio,
        }
    }

    fn check_range(&self) -> Result<(), TableError> {
        let fields = [
            ("benchmark_cashflow", self.benchmark_cashflow),
            ("benchmark_portfolio", self.benchmark_portfolio),
            ("strategy_cashflow", self.strategy_cashflow),
            ("strategy_portfolio", self.strategy_portfolio),
        ];
        for (field, value) in fields {
            if value.abs() > MAX_MONEY_MAGNITUDE {
                return Err(TableError::OutOfRange {
                    date: self.date,
                    field,
                    max: MAX_MONEY_MAGNITUDE,
                });
            }
        }
        Ok(())
    }

    /// Benchmark portfolio plus any cash held from net sales.
    pub fn benchmark_total_value(&self) -> Decimal {
        self.benchmark_portfolio + self.benchmark_cashflow.max(Decimal::ZERO)
    }

    /// Strategy portfolio plus any cash held from net sales.
    pub fn strategy_total_value(&self) -> Decimal {
        self.strategy_portfolio + self.strategy_cashflow.max(Decimal::ZERO)
    }
}

/// Chronologically ordered, non-empty table of daily results.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyResults {
    rows: Vec<DailyResult>,
}

impl DailyResults {
    /// Build a table, sorting rows by date. Rows sharing a date keep
    /// their input order. Money values beyond [`MAX_MONEY_MAGNITUDE`]
    /// are rejected.
    pub fn new(mut rows: Vec<DailyResult>) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Err(TableError::Empty);
        }
        for row in &rows {
            row.check_range()?;
        }
        rows.sort_by_key(|r| r.date);
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[DailyResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.rows[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.rows[self.rows.len() - 1].date
    }

    /// Reduce to one row per calendar month: the first observation of
    /// each month, in chronological order.
    pub fn monthly(&self) -> Vec<DailyResult> {
        let mut monthly: Vec<DailyResult> = Vec::new();
        for row in &self.rows {
            let is_new_month = monthly
                .last()
                .map(|prev| month_start(prev.date) != month_start(row.date))
                .unwrap_or(true);
            if is_new_month {
                monthly.push(row.clone());
            }
        }
        monthly
    }

    /// Number of distinct calendar months covered.
    pub fn month_count(&self) -> usize {
        self.monthly().len()
    }
}

/// A series of values indexed by month-start date. Dates and values
/// always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMonthlySeries<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct MonthlySeries<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

#[derive(Deserialize)]
struct RawMonthlySeries<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

impl<T> TryFrom<RawMonthlySeries<T>> for MonthlySeries<T> {
    type Error = TableError;

    fn try_from(raw: RawMonthlySeries<T>) -> Result<Self, Self::Error> {
        Self::try_new(raw.dates, raw.values)
    }
}

impl<T> MonthlySeries<T> {
    /// Pair dates with values.
    ///
    /// # Panics
    /// If the lengths differ.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<T>) -> Self {
        assert_eq!(dates.len(), values.len(), "MonthlySeries dates and values differ in length");
        Self { dates, values }
    }

    pub fn try_new(dates: Vec<NaiveDate>, values: Vec<T>) -> Result<Self, TableError> {
        if dates.len() != values.len() {
            return Err(TableError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }
        Ok(Self { dates, values })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.values.get(idx)
    }

    pub fn first(&self) -> Option<&T> {
        self.values.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.values.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &T)> {
        self.dates.iter().copied().zip(self.values.iter())
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Whether `date` falls on the first of its month.
pub fn is_month_start(date: NaiveDate) -> bool {
    date.day() == 1
}

/// Months since year 0, for month arithmetic.
pub fn month_ordinal(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Inverse of [`month_ordinal`], returning the month-start date.
pub fn month_from_ordinal(ordinal: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(ordinal.div_euclid(12), ordinal.rem_euclid(12) as u32 + 1, 1)
}
