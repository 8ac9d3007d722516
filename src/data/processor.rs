//! Data Processor Module
//! Aggregation by state and wide-to-long reshaping of dated columns.

use crate::config::DateHeaderFormat;
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("state '{0}' not found in aggregated table")]
    StateNotFound(String),
    #[error("column header '{0}' does not parse as a date")]
    DateParse(String),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// A single observation in a state's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One state's cumulative series in long form, sorted by ascending date.
#[derive(Debug, Clone)]
pub struct DailySeries {
    pub state: String,
    pub points: Vec<TimePoint>,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Collapses raw per-county rows into one row per state.
pub struct Aggregator;

impl Aggregator {
    /// Group by the state column and sum every dated column.
    ///
    /// Missing values count as zero. Row order follows first appearance in
    /// the input; column order is preserved from `date_cols`.
    pub fn aggregate_by_state(
        df: &DataFrame,
        state_col: &str,
        date_cols: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let sums: Vec<Expr> = date_cols.iter().map(|c| col(c.as_str()).sum()).collect();
        let aggregated = df
            .clone()
            .lazy()
            .group_by_stable([col(state_col)])
            .agg(sums)
            .collect()?;
        Ok(aggregated)
    }
}

/// Pivots one state's wide dated row into a long series.
pub struct Reshaper;

impl Reshaper {
    /// Parse a dated column header, e.g. `X3.15.21` -> 2021-03-15.
    pub fn parse_header(
        header: &str,
        format: &DateHeaderFormat,
    ) -> Result<NaiveDate, ProcessorError> {
        format
            .parse(header)
            .ok_or_else(|| ProcessorError::DateParse(header.to_string()))
    }

    /// Extract `state`'s row and emit its (date, value) pairs sorted by
    /// parsed date. Duplicate dates are rejected rather than silently
    /// merged, so column order never has to be trusted as chronology.
    pub fn to_daily_series(
        df: &DataFrame,
        state_col: &str,
        state: &str,
        date_cols: &[String],
        format: &DateHeaderFormat,
    ) -> Result<DailySeries, ProcessorError> {
        let row = df
            .clone()
            .lazy()
            .filter(col(state_col).eq(lit(state)))
            .collect()?;
        if row.height() == 0 {
            return Err(ProcessorError::StateNotFound(state.to_string()));
        }

        let mut points = Vec::with_capacity(date_cols.len());
        for header in date_cols {
            let date = Self::parse_header(header, format)?;
            let value_series = row.column(header)?;
            let value_f64 = value_series.cast(&DataType::Float64)?;
            let value_ca = value_f64.f64()?;
            let value = value_ca.get(0).unwrap_or(0.0);
            points.push(TimePoint { date, value });
        }

        points.sort_by_key(|p| p.date);
        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(ProcessorError::SchemaMismatch(format!(
                    "duplicate dated column for {}",
                    pair[0].date
                )));
            }
        }

        Ok(DailySeries {
            state: state.to_string(),
            points,
        })
    }
}
