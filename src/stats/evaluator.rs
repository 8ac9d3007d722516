//! Model Evaluator Module
//! Applies a fitted model to every state's most recent totals.

use crate::stats::LinearModel;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("aggregated tables expose no dated columns")]
    NoDateColumns,
}

/// Per-state comparison of predicted against actual most recent deaths.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvaluation {
    pub state: String,
    pub most_recent_cases: f64,
    pub most_recent_deaths: f64,
    pub predicted_deaths: f64,
    /// Root-mean-squared error over the single most recent point, which
    /// collapses to the absolute prediction error.
    pub rmse: f64,
}

/// Evaluates how the fitted model generalizes across states.
pub struct Evaluator;

impl Evaluator {
    /// Evaluate every state present in both aggregated tables, in the
    /// cases table's row order. Each table contributes its own most
    /// recent column; no merged-table position arithmetic.
    pub fn evaluate_all(
        model: &LinearModel,
        cases: &DataFrame,
        deaths: &DataFrame,
        state_col: &str,
        date_cols: &[String],
    ) -> Result<Vec<StateEvaluation>, EvaluatorError> {
        let latest = date_cols.last().ok_or(EvaluatorError::NoDateColumns)?;

        let deaths_by_state = Self::latest_by_state(deaths, state_col, latest)?;

        let state_series = cases.column(state_col)?;
        let case_f64 = cases.column(latest)?.cast(&DataType::Float64)?;
        let case_ca = case_f64.f64()?;

        let mut evaluations = Vec::with_capacity(cases.height());
        for i in 0..cases.height() {
            let Ok(name) = state_series.get(i) else {
                continue;
            };
            if name.is_null() {
                continue;
            }
            let state = name.to_string().trim_matches('"').to_string();

            let Some(&most_recent_deaths) = deaths_by_state.get(&state) else {
                warn!(state = %state, "state missing from deaths table, skipped");
                continue;
            };
            let most_recent_cases = case_ca.get(i).unwrap_or(0.0);
            let predicted_deaths = model.predict(most_recent_cases);
            let rmse = (predicted_deaths - most_recent_deaths).powi(2).sqrt();

            evaluations.push(StateEvaluation {
                state,
                most_recent_cases,
                most_recent_deaths,
                predicted_deaths,
                rmse,
            });
        }

        Ok(evaluations)
    }

    /// Map each state to its value in the given dated column.
    fn latest_by_state(
        df: &DataFrame,
        state_col: &str,
        latest: &str,
    ) -> Result<HashMap<String, f64>, EvaluatorError> {
        let state_series = df.column(state_col)?;
        let value_f64 = df.column(latest)?.cast(&DataType::Float64)?;
        let value_ca = value_f64.f64()?;

        let mut by_state = HashMap::with_capacity(df.height());
        for i in 0..df.height() {
            if let (Ok(name), Some(value)) = (state_series.get(i), value_ca.get(i)) {
                if !name.is_null() {
                    by_state.insert(name.to_string().trim_matches('"').to_string(), value);
                }
            }
        }
        Ok(by_state)
    }
}
