//! Linear Regression Module
//! Closed-form ordinary least squares over a joined pair of state series.

use crate::data::DailySeries;
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("insufficient data: {0} joined point(s), need at least 2")]
    InsufficientData(usize),
    #[error("degenerate input: predictor has zero variance")]
    DegenerateInput,
}

/// Fitted line mapping cumulative cases to cumulative deaths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearModel {
    /// Predicted deaths for a given case count.
    pub fn predict(&self, cases: f64) -> f64 {
        self.slope * cases + self.intercept
    }
}

/// Fits deaths as a linear function of cases.
pub struct LinearRegressor;

impl LinearRegressor {
    /// Inner-join two series on date into (cases, deaths) pairs, in the
    /// cases series' date order. Dates missing from either side drop out.
    pub fn join_on_date(cases: &DailySeries, deaths: &DailySeries) -> Vec<(f64, f64)> {
        let deaths_by_date: HashMap<NaiveDate, f64> = deaths
            .points
            .iter()
            .map(|p| (p.date, p.value))
            .collect();

        cases
            .points
            .iter()
            .filter_map(|p| deaths_by_date.get(&p.date).map(|&d| (p.value, d)))
            .collect()
    }

    /// Join on date, then fit.
    pub fn fit(cases: &DailySeries, deaths: &DailySeries) -> Result<LinearModel, RegressionError> {
        Self::fit_pairs(&Self::join_on_date(cases, deaths))
    }

    /// Closed-form OLS over (x, y) pairs: slope = Sxy / Sxx, intercept
    /// through the means, R^2 = 1 - SSres / SStot.
    pub fn fit_pairs(pairs: &[(f64, f64)]) -> Result<LinearModel, RegressionError> {
        if pairs.len() < 2 {
            return Err(RegressionError::InsufficientData(pairs.len()));
        }

        let xs: Vec<f64> = pairs.iter().map(|&(x, _)| x).collect();
        let ys: Vec<f64> = pairs.iter().map(|&(_, y)| y).collect();

        let x_mean = Statistics::mean(&xs);
        let y_mean = Statistics::mean(&ys);
        if Statistics::variance(&xs) == 0.0 {
            return Err(RegressionError::DegenerateInput);
        }

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for &(x, y) in pairs {
            sxx += (x - x_mean) * (x - x_mean);
            sxy += (x - x_mean) * (y - y_mean);
        }
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for &(x, y) in pairs {
            ss_res += (y - (slope * x + intercept)).powi(2);
            ss_tot += (y - y_mean).powi(2);
        }
        // A flat response fitted exactly has no residual to explain.
        let r_squared = if ss_tot == 0.0 {
            1.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Ok(LinearModel {
            slope,
            intercept,
            r_squared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimePoint;

    fn series(state: &str, start_day: u32, values: &[f64]) -> DailySeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| TimePoint {
                date: NaiveDate::from_ymd_opt(2021, 1, start_day + i as u32).unwrap(),
                value,
            })
            .collect();
        DailySeries {
            state: state.to_string(),
            points,
        }
    }

    #[test]
    fn recovers_known_coefficients() {
        let cases = series("Alpha", 1, &[10.0, 20.0, 30.0, 40.0]);
        let deaths = series("Alpha", 1, &[1.0, 2.0, 3.0, 4.1]);

        let model = LinearRegressor::fit(&cases, &deaths).unwrap();
        assert!((model.slope - 0.103).abs() < 0.05);
        assert!((model.intercept - (-0.05)).abs() < 0.05);
        assert!(model.r_squared > 0.99);
    }

    #[test]
    fn fit_is_deterministic() {
        let cases = series("Alpha", 1, &[3.0, 7.0, 11.0, 20.0, 26.0]);
        let deaths = series("Alpha", 1, &[1.0, 2.0, 2.0, 5.0, 6.0]);

        let first = LinearRegressor::fit(&cases, &deaths).unwrap();
        let second = LinearRegressor::fit(&cases, &deaths).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn disjoint_dates_are_insufficient() {
        let cases = series("Alpha", 1, &[10.0, 20.0]);
        let deaths = series("Alpha", 10, &[1.0, 2.0]);

        let err = LinearRegressor::fit(&cases, &deaths).unwrap_err();
        assert!(matches!(err, RegressionError::InsufficientData(0)));
    }

    #[test]
    fn single_joined_point_is_insufficient() {
        let cases = series("Alpha", 1, &[10.0, 20.0]);
        let deaths = series("Alpha", 2, &[1.0, 2.0]);

        let err = LinearRegressor::fit(&cases, &deaths).unwrap_err();
        assert!(matches!(err, RegressionError::InsufficientData(1)));
    }

    #[test]
    fn constant_predictor_is_degenerate() {
        let pairs = [(5.0, 1.0), (5.0, 2.0), (5.0, 3.0)];
        let err = LinearRegressor::fit_pairs(&pairs).unwrap_err();
        assert!(matches!(err, RegressionError::DegenerateInput));
    }

    #[test]
    fn prediction_applies_slope_and_intercept() {
        let model = LinearModel {
            slope: 0.5,
            intercept: 10.0,
            r_squared: 1.0,
        };
        assert_eq!(model.predict(100.0), 60.0);
    }

    #[test]
    fn perfect_line_has_unit_r_squared() {
        let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        let model = LinearRegressor::fit_pairs(&pairs).unwrap();
        assert!((model.slope - 2.0).abs() < 1e-12);
        assert!(model.intercept.abs() < 1e-12);
        assert!((model.r_squared - 1.0).abs() < 1e-12);
    }
}
