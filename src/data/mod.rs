//! Data module - table loading, aggregation, and reshaping

mod loader;
mod processor;

pub use loader::{DataLoader, LoaderError};
pub use processor::{Aggregator, DailySeries, ProcessorError, Reshaper, TimePoint};
