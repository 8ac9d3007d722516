//! Results Report Module
//! Formats the evaluation table for the console and writes it as CSV.

use crate::stats::StateEvaluation;
use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Renders evaluation results. The console table is printed in full, one
/// row per state, never truncated.
pub struct Reporter;

impl Reporter {
    /// Fixed-width results table in evaluation order.
    pub fn format_table(evaluations: &[StateEvaluation]) -> String {
        let state_width = evaluations
            .iter()
            .map(|e| e.state.len())
            .max()
            .unwrap_or(0)
            .max("State".len());

        let mut out = String::new();
        out.push_str(&format!(
            "{:<width$}  {:>14}  {:>16}  {:>10}\n",
            "State",
            "Recent deaths",
            "Predicted deaths",
            "RMSE",
            width = state_width
        ));
        for e in evaluations {
            out.push_str(&format!(
                "{:<width$}  {:>14.0}  {:>16.1}  {:>10.1}\n",
                e.state,
                e.most_recent_deaths,
                e.predicted_deaths,
                e.rmse,
                width = state_width
            ));
        }
        out
    }

    /// Write the evaluations as a CSV artifact.
    pub fn write_csv(evaluations: &[StateEvaluation], path: &Path) -> Result<()> {
        let states: Vec<String> = evaluations.iter().map(|e| e.state.clone()).collect();
        let cases: Vec<f64> = evaluations.iter().map(|e| e.most_recent_cases).collect();
        let deaths: Vec<f64> = evaluations.iter().map(|e| e.most_recent_deaths).collect();
        let predicted: Vec<f64> = evaluations.iter().map(|e| e.predicted_deaths).collect();
        let rmse: Vec<f64> = evaluations.iter().map(|e| e.rmse).collect();

        let mut df = DataFrame::new(vec![
            Column::new("state".into(), states),
            Column::new("most_recent_cases".into(), cases),
            Column::new("most_recent_deaths".into(), deaths),
            Column::new("predicted_deaths".into(), predicted),
            Column::new("rmse".into(), rmse),
        ])?;

        let mut file = File::create(path)
            .with_context(|| format!("creating results file {}", path.display()))?;
        CsvWriter::new(&mut file)
            .finish(&mut df)
            .context("writing results CSV")?;
        Ok(())
    }
}
