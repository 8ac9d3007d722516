//! CSV Table Loader Module
//! Fetches the cases and deaths tables and validates their shared schema.

use crate::config::PipelineConfig;
use polars::prelude::*;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("data source unavailable: {0}")]
    DataUnavailable(String),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("state column '{0}' not found in source table")]
    MissingStateColumn(String),
    #[error("schema mismatch between cases and deaths tables: {0}")]
    SchemaMismatch(String),
}

/// Holds both metric tables after cleaning, plus their shared date columns.
///
/// The two tables must expose the identical set of dated columns in the
/// same order; anything else aborts the run.
#[derive(Debug)]
pub struct DataLoader {
    cases: DataFrame,
    deaths: DataFrame,
    date_columns: Vec<String>,
}

impl DataLoader {
    /// Read, clean, and schema-check both tables.
    pub fn load(config: &PipelineConfig) -> Result<Self, LoaderError> {
        let cases = Self::read_table(&config.cases_source, config)?;
        let deaths = Self::read_table(&config.deaths_source, config)?;
        Self::from_frames(cases, deaths, config)
    }

    /// Build a loader from already-parsed tables: drops excluded regions
    /// and enforces the date-alignment invariant.
    pub fn from_frames(
        cases: DataFrame,
        deaths: DataFrame,
        config: &PipelineConfig,
    ) -> Result<Self, LoaderError> {
        let state_col = config.state_column.as_str();
        for df in [&cases, &deaths] {
            if df.column(state_col).is_err() {
                return Err(LoaderError::MissingStateColumn(config.state_column.clone()));
            }
        }

        let cases = Self::drop_excluded_regions(cases, state_col, &config.excluded_regions)?;
        let deaths = Self::drop_excluded_regions(deaths, state_col, &config.excluded_regions)?;

        let case_dates = Self::date_columns_of(&cases, config);
        let death_dates = Self::date_columns_of(&deaths, config);
        if case_dates.is_empty() {
            return Err(LoaderError::SchemaMismatch(
                "cases table exposes no dated columns".to_string(),
            ));
        }
        if case_dates != death_dates {
            return Err(LoaderError::SchemaMismatch(format!(
                "cases table has {} dated columns, deaths table has {}",
                case_dates.len(),
                death_dates.len()
            )));
        }

        info!(
            case_rows = cases.height(),
            death_rows = deaths.height(),
            dates = case_dates.len(),
            "tables loaded and schema-checked"
        );

        Ok(Self {
            cases,
            deaths,
            date_columns: case_dates,
        })
    }

    /// Read one table from a path or an http(s) URL.
    fn read_table(source: &str, config: &PipelineConfig) -> Result<DataFrame, LoaderError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch_remote(source, config.fetch_timeout_secs)
        } else {
            LazyCsvReader::new(source)
                .with_infer_schema_length(Some(10000))
                .with_ignore_errors(true)
                .finish()
                .and_then(|lazy| lazy.collect())
                .map_err(|e| LoaderError::DataUnavailable(format!("{source}: {e}")))
        }
    }

    /// Single blocking fetch with a bounded timeout, then CSV parse.
    fn fetch_remote(url: &str, timeout_secs: u64) -> Result<DataFrame, LoaderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LoaderError::DataUnavailable(format!("{url}: {e}")))?;

        let body = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| LoaderError::DataUnavailable(format!("{url}: {e}")))?;

        CsvReadOptions::default()
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(body.to_vec()))
            .finish()
            .map_err(|e| LoaderError::DataUnavailable(format!("{url}: {e}")))
    }

    /// Remove rows whose state name is in the configured exclusion set.
    fn drop_excluded_regions(
        df: DataFrame,
        state_col: &str,
        excluded: &[String],
    ) -> Result<DataFrame, LoaderError> {
        let mut keep = col(state_col).is_not_null();
        for region in excluded {
            keep = keep.and(col(state_col).neq(lit(region.as_str())));
        }
        Ok(df.lazy().filter(keep).collect()?)
    }

    /// Columns whose header parses under the configured date grammar,
    /// in table order.
    fn date_columns_of(df: &DataFrame, config: &PipelineConfig) -> Vec<String> {
        df.get_column_names()
            .iter()
            .filter(|name| config.date_headers.parse(name.as_str()).is_some())
            .map(|name| name.to_string())
            .collect()
    }

    /// Get the cleaned cases table.
    pub fn get_cases(&self) -> &DataFrame {
        &self.cases
    }

    /// Get the cleaned deaths table.
    pub fn get_deaths(&self) -> &DataFrame {
        &self.deaths
    }

    /// Get the shared dated column headers, in table order.
    pub fn get_date_columns(&self) -> &[String] {
        &self.date_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            state_column: "Province_State".to_string(),
            excluded_regions: vec!["Diamond Princess".to_string(), "Guam".to_string()],
            ..PipelineConfig::default()
        }
    }

    fn raw_table() -> DataFrame {
        df!(
            "Province_State" => ["Alabama", "Alabama", "Guam", "Diamond Princess"],
            "Lat" => [32.5, 33.1, 13.4, 0.0],
            "X1.1.21" => [10i64, 5, 3, 1],
            "X1.2.21" => [12i64, 6, 3, 1],
        )
        .unwrap()
    }

    #[test]
    fn excluded_regions_are_dropped() {
        let config = test_config();
        let loader = DataLoader::from_frames(raw_table(), raw_table(), &config).unwrap();

        let states = loader.get_cases().column("Province_State").unwrap().clone();
        for i in 0..states.len() {
            let name = states.get(i).unwrap().to_string();
            assert!(!name.contains("Guam"));
            assert!(!name.contains("Diamond Princess"));
        }
        assert_eq!(loader.get_cases().height(), 2);
    }

    #[test]
    fn date_columns_are_detected_in_order() {
        let config = test_config();
        let loader = DataLoader::from_frames(raw_table(), raw_table(), &config).unwrap();
        assert_eq!(loader.get_date_columns(), ["X1.1.21", "X1.2.21"]);
    }

    #[test]
    fn mismatched_date_columns_are_a_schema_error() {
        let config = test_config();
        let deaths = df!(
            "Province_State" => ["Alabama"],
            "X1.1.21" => [2i64],
        )
        .unwrap();

        let err = DataLoader::from_frames(raw_table(), deaths, &config).unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));
    }

    #[test]
    fn missing_state_column_is_reported() {
        let config = test_config();
        let no_state = df!("X1.1.21" => [1i64]).unwrap();

        let err = DataLoader::from_frames(no_state, raw_table(), &config).unwrap_err();
        assert!(matches!(err, LoaderError::MissingStateColumn(_)));
    }

    #[test]
    fn tables_without_dates_are_a_schema_error() {
        let config = test_config();
        let no_dates = df!("Province_State" => ["Alabama"], "Lat" => [32.5]).unwrap();

        let err = DataLoader::from_frames(no_dates.clone(), no_dates, &config).unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));
    }
}
