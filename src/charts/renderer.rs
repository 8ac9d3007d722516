//! Static Chart Renderer
//! Draws the run's presentation artifacts as PNG files.
//!
//! Artifacts:
//! 1. Bar charts: deaths and cases by state, sorted descending
//! 2. Line charts: the reference state's deaths and cases over time
//! 3. Scatter + fitted line for the reference state

use crate::data::DailySeries;
use crate::stats::LinearModel;
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (1280, 720);

// Colors (RGB)
const BAR_COLOR: RGBColor = RGBColor(91, 155, 213);
const LINE_COLOR: RGBColor = RGBColor(237, 125, 49);
const FIT_COLOR: RGBColor = RGBColor(112, 173, 71);

pub struct ChartRenderer;

impl ChartRenderer {
    /// Descending bar chart of one metric across states.
    pub fn render_state_bars(
        values_by_state: &[(String, f64)],
        title: &str,
        path: &Path,
    ) -> Result<()> {
        let mut ranked = values_by_state.to_vec();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        if ranked.is_empty() {
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
            return Ok(());
        }

        let y_max = ranked[0].1.max(1.0);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28))
            .margin(10)
            .x_label_area_size(120)
            .y_label_area_size(80)
            .build_cartesian_2d(0usize..ranked.len(), 0f64..y_max * 1.05)?;

        let names: Vec<String> = ranked.iter().map(|(state, _)| state.clone()).collect();
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(ranked.len())
            .x_label_formatter(&|idx| names.get(*idx).cloned().unwrap_or_default())
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .draw()?;

        chart.draw_series(ranked.iter().enumerate().map(|(i, (_, value))| {
            Rectangle::new([(i, 0.0), (i + 1, *value)], BAR_COLOR.filled())
        }))?;

        root.present()
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Time-series line chart for one state's metric.
    pub fn render_series_line(series: &DailySeries, title: &str, path: &Path) -> Result<()> {
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        if series.is_empty() {
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
            return Ok(());
        }

        let y_max = series
            .points
            .iter()
            .map(|p| p.value)
            .fold(0.0f64, f64::max)
            .max(1.0);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0usize..series.len(), 0f64..y_max * 1.05)?;

        let labels: Vec<String> = series
            .points
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect();
        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&|idx| labels.get(*idx).cloned().unwrap_or_default())
            .draw()?;

        chart.draw_series(LineSeries::new(
            series.points.iter().enumerate().map(|(i, p)| (i, p.value)),
            LINE_COLOR.stroke_width(2),
        ))?;

        root.present()
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Scatter of joined (cases, deaths) points with the fitted line.
    pub fn render_fit_scatter(
        pairs: &[(f64, f64)],
        model: &LinearModel,
        title: &str,
        path: &Path,
    ) -> Result<()> {
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        if pairs.is_empty() {
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
            return Ok(());
        }

        let x_max = pairs.iter().map(|&(x, _)| x).fold(0.0f64, f64::max).max(1.0);
        let y_max = pairs
            .iter()
            .map(|&(_, y)| y)
            .chain([model.predict(x_max)])
            .fold(0.0f64, f64::max)
            .max(1.0);

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0f64..x_max * 1.05, 0f64..y_max * 1.05)?;

        chart
            .configure_mesh()
            .x_desc("Cumulative cases")
            .y_desc("Cumulative deaths")
            .draw()?;

        chart.draw_series(
            pairs
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BAR_COLOR.filled())),
        )?;

        chart
            .draw_series(LineSeries::new(
                [0.0, x_max].into_iter().map(|x| (x, model.predict(x))),
                FIT_COLOR.stroke_width(2),
            ))?
            .label(format!(
                "fit: y = {:.5}x + {:.2}  (R^2 = {:.4})",
                model.slope, model.intercept, model.r_squared
            ))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], FIT_COLOR.stroke_width(2)));

        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;

        root.present()
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
