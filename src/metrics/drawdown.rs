//! Drawdown analysis on daily total value.
//!
//! Total value is portfolio value plus any cash held from net sales, so a
//! strategy that sells into strength isn't shown as drawing down.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::types::{DailyResult, DailyResults};

/// Drawdown analysis details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// Currency decline at the worst percentage drawdown.
    pub max_drawdown: Decimal,
    /// Most negative decline as a percentage of the running peak.
    pub max_drawdown_pct: f64,
    pub peak_date: Option<NaiveDate>,
    pub max_drawdown_date: Option<NaiveDate>,
    pub duration_days: i64,
    pub drawdown_periods: usize,
}

impl Default for DrawdownAnalysis {
    fn default() -> Self {
        Self {
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: 0.0,
            peak_date: None,
            max_drawdown_date: None,
            duration_days: 0,
            drawdown_periods: 0,
        }
    }
}

/// Benchmark drawdown over the daily table.
pub fn benchmark_drawdown(results: &DailyResults) -> DrawdownAnalysis {
    analyze_drawdown(results.rows(), DailyResult::benchmark_total_value)
}

/// Strategy drawdown over the daily table.
pub fn strategy_drawdown(results: &DailyResults) -> DrawdownAnalysis {
    analyze_drawdown(results.rows(), DailyResult::strategy_total_value)
}

/// Analyze drawdown of `value` across `rows` in order.
pub fn analyze_drawdown(rows: &[DailyResult], value: impl Fn(&DailyResult) -> Decimal) -> DrawdownAnalysis {
    let Some(first) = rows.first() else {
        return DrawdownAnalysis::default();
    };

    let mut peak = value(first);
    let mut peak_date = first.date;
    let mut analysis = DrawdownAnalysis::default();
    let mut drawdown_start: Option<NaiveDate> = None;

    for row in rows {
        let current = value(row);

        if current > peak {
            if drawdown_start.take().is_some() {
                analysis.drawdown_periods += 1;
            }
            peak = current;
            peak_date = row.date;
            continue;
        }

        let drawdown = peak - current;
        if drawdown.is_zero() {
            continue;
        }

        let start = *drawdown_start.get_or_insert(peak_date);
        let drawdown_pct = if peak > Decimal::ZERO {
            -(drawdown / peak).to_f64().unwrap_or(0.0) * 100.0
        } else {
            0.0
        };

        // Worst is by percentage of the peak, not by currency amount.
        if drawdown_pct < analysis.max_drawdown_pct {
            analysis.max_drawdown = drawdown;
            analysis.max_drawdown_pct = drawdown_pct;
            analysis.peak_date = Some(peak_date);
            analysis.max_drawdown_date = Some(row.date);
            analysis.duration_days = (row.date - start).num_days();
        }
    }

    if drawdown_start.is_some() {
        analysis.drawdown_periods += 1;
    }

    analysis
}
