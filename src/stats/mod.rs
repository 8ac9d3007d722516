//! Stats module - model fitting and evaluation

mod evaluator;
mod regression;

pub use evaluator::{Evaluator, EvaluatorError, StateEvaluation};
pub use regression::{LinearModel, LinearRegressor, RegressionError};
