//! Statecast - US State Case/Death Time-Series Analysis
//!
//! A linear batch pipeline: load the confirmed-cases and deaths tables,
//! aggregate them by state, reshape the reference state's series, fit a
//! cases-to-deaths line, and evaluate it against every state's most
//! recent totals. Any stage failure aborts the run.

mod config;
mod data;
mod stats;
mod report;
mod charts;

use anyhow::{Context, Result};
use charts::ChartRenderer;
use config::PipelineConfig;
use data::{Aggregator, DailySeries, DataLoader, Reshaper};
use report::Reporter;
use stats::{Evaluator, LinearModel, LinearRegressor, StateEvaluation};
use std::path::Path;
use tracing::info;

/// Everything the reporting and chart stages consume.
#[derive(Debug)]
struct PipelineRun {
    case_series: DailySeries,
    death_series: DailySeries,
    joined_pairs: Vec<(f64, f64)>,
    model: LinearModel,
    evaluations: Vec<StateEvaluation>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = PipelineConfig::load_or_default(Path::new(config::DEFAULT_CONFIG_FILE))
        .context("configuration")?;

    let run = run_pipeline(&config)?;
    emit_outputs(&config, &run)
}

/// Load -> aggregate -> reshape -> fit -> evaluate.
fn run_pipeline(config: &PipelineConfig) -> Result<PipelineRun> {
    let loader = DataLoader::load(config).context("loader stage")?;
    let state_col = config.state_column.as_str();
    let date_cols = loader.get_date_columns().to_vec();

    let cases = Aggregator::aggregate_by_state(loader.get_cases(), state_col, &date_cols)
        .context("aggregator stage (cases)")?;
    let deaths = Aggregator::aggregate_by_state(loader.get_deaths(), state_col, &date_cols)
        .context("aggregator stage (deaths)")?;
    info!(states = cases.height(), "aggregated by state");

    let case_series = Reshaper::to_daily_series(
        &cases,
        state_col,
        &config.reference_state,
        &date_cols,
        &config.date_headers,
    )
    .context("reshaper stage (cases)")?;
    let death_series = Reshaper::to_daily_series(
        &deaths,
        state_col,
        &config.reference_state,
        &date_cols,
        &config.date_headers,
    )
    .context("reshaper stage (deaths)")?;

    let joined_pairs = LinearRegressor::join_on_date(&case_series, &death_series);
    let model = LinearRegressor::fit_pairs(&joined_pairs).context("modeler stage")?;
    info!(
        slope = model.slope,
        intercept = model.intercept,
        r_squared = model.r_squared,
        state = %config.reference_state,
        "model fitted"
    );

    let evaluations = Evaluator::evaluate_all(&model, &cases, &deaths, state_col, &date_cols)
        .context("evaluator stage")?;
    info!(states = evaluations.len(), "model evaluated");

    Ok(PipelineRun {
        case_series,
        death_series,
        joined_pairs,
        model,
        evaluations,
    })
}

/// Print the full results table, then write the CSV and chart artifacts.
fn emit_outputs(config: &PipelineConfig, run: &PipelineRun) -> Result<()> {
    println!("{}", Reporter::format_table(&run.evaluations));

    let out = &config.output_dir;
    std::fs::create_dir_all(out)
        .with_context(|| format!("creating output directory {}", out.display()))?;

    Reporter::write_csv(&run.evaluations, &out.join("state_evaluations.csv"))
        .context("report stage")?;

    let deaths_by_state: Vec<(String, f64)> = run
        .evaluations
        .iter()
        .map(|e| (e.state.clone(), e.most_recent_deaths))
        .collect();
    let cases_by_state: Vec<(String, f64)> = run
        .evaluations
        .iter()
        .map(|e| (e.state.clone(), e.most_recent_cases))
        .collect();

    let reference = &config.reference_state;
    ChartRenderer::render_state_bars(
        &deaths_by_state,
        "Deaths by state",
        &out.join("deaths_by_state.png"),
    )
    .context("chart stage")?;
    ChartRenderer::render_state_bars(
        &cases_by_state,
        "Confirmed cases by state",
        &out.join("cases_by_state.png"),
    )
    .context("chart stage")?;
    ChartRenderer::render_series_line(
        &run.death_series,
        &format!("{reference} deaths over time"),
        &out.join("reference_deaths.png"),
    )
    .context("chart stage")?;
    ChartRenderer::render_series_line(
        &run.case_series,
        &format!("{reference} confirmed cases over time"),
        &out.join("reference_cases.png"),
    )
    .context("chart stage")?;
    ChartRenderer::render_fit_scatter(
        &run.joined_pairs,
        &run.model,
        &format!("{reference}: deaths vs cases"),
        &out.join("deaths_vs_cases_fit.png"),
    )
    .context("chart stage")?;

    info!("pipeline complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateHeaderFormat;

    const CASES_CSV: &str = "\
Admin2,Province_State,Lat,X1.1.21,X1.2.21,X1.3.21
CountyA,Alpha,1.0,10,20,30
CountyB,Alpha,1.1,5,10,15
CountyC,Beta,2.0,2,4,8
Ship,Excluded Ship,0.0,1,1,1
";

    const DEATHS_CSV: &str = "\
Admin2,Province_State,Lat,X1.1.21,X1.2.21,X1.3.21
CountyA,Alpha,1.0,1,3,5
CountyB,Alpha,1.1,0,1,2
CountyC,Beta,2.0,0,0,1
Ship,Excluded Ship,0.0,0,0,0
";

    fn fixture_config(dir: &Path) -> PipelineConfig {
        let cases_path = dir.join("cases.csv");
        let deaths_path = dir.join("deaths.csv");
        std::fs::write(&cases_path, CASES_CSV).unwrap();
        std::fs::write(&deaths_path, DEATHS_CSV).unwrap();

        PipelineConfig {
            cases_source: cases_path.to_str().unwrap().to_string(),
            deaths_source: deaths_path.to_str().unwrap().to_string(),
            state_column: "Province_State".to_string(),
            date_headers: DateHeaderFormat::default(),
            excluded_regions: vec!["Excluded Ship".to_string()],
            reference_state: "Alpha".to_string(),
            fetch_timeout_secs: 5,
            output_dir: dir.join("output"),
        }
    }

    #[test]
    fn pipeline_runs_end_to_end_on_synthetic_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());

        let run = run_pipeline(&config).unwrap();

        // Alpha sums: cases 15/30/45, deaths 1/4/7 -> exact line y = 0.2x - 2.
        assert!((run.model.slope - 0.2).abs() < 1e-9);
        assert!((run.model.intercept - (-2.0)).abs() < 1e-9);
        assert!((run.model.r_squared - 1.0).abs() < 1e-9);

        assert_eq!(run.case_series.values(), [15.0, 30.0, 45.0]);
        assert_eq!(run.death_series.values(), [1.0, 4.0, 7.0]);
        assert_eq!(run.joined_pairs.len(), 3);

        // Excluded region never reaches evaluation; order follows the
        // cases table's first-appearance order.
        let states: Vec<&str> = run.evaluations.iter().map(|e| e.state.as_str()).collect();
        assert_eq!(states, ["Alpha", "Beta"]);

        let alpha = &run.evaluations[0];
        assert_eq!(alpha.most_recent_cases, 45.0);
        assert_eq!(alpha.most_recent_deaths, 7.0);
        assert!((alpha.predicted_deaths - 7.0).abs() < 1e-9);
        assert!(alpha.rmse < 1e-9);

        let beta = &run.evaluations[1];
        assert_eq!(beta.most_recent_cases, 8.0);
        assert_eq!(beta.most_recent_deaths, 1.0);
        assert!((beta.predicted_deaths - (-0.4)).abs() < 1e-9);
        assert!((beta.rmse - 1.4).abs() < 1e-9);
    }

    #[test]
    fn unknown_reference_state_fails_the_reshaper_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            reference_state: "Nowhere".to_string(),
            ..fixture_config(dir.path())
        };

        let err = run_pipeline(&config).unwrap_err();
        assert!(format!("{err:#}").contains("reshaper stage"));
    }

    #[test]
    fn missing_source_fails_the_loader_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            cases_source: dir.path().join("absent.csv").to_str().unwrap().to_string(),
            ..fixture_config(dir.path())
        };

        let err = run_pipeline(&config).unwrap_err();
        assert!(format!("{err:#}").contains("loader stage"));
    }
}
