//! Pipeline Configuration Module
//! Run-time configuration for sources, schema constants, and output paths.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional override file checked next to the binary at startup.
pub const DEFAULT_CONFIG_FILE: &str = "statecast.json";

/// Regions removed before aggregation: cruise ships and non-state entities.
const EXCLUDED_REGIONS: [&str; 8] = [
    "Diamond Princess",
    "Grand Princess",
    "American Samoa",
    "District of Columbia",
    "Guam",
    "Northern Mariana Islands",
    "Puerto Rico",
    "Virgin Islands",
];

/// Grammar of dated column headers: one literal prefix character followed
/// by a chrono format string, e.g. `X3.15.21` -> 2021-03-15.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DateHeaderFormat {
    pub prefix: char,
    pub format: String,
}

impl Default for DateHeaderFormat {
    fn default() -> Self {
        Self {
            prefix: 'X',
            format: "%m.%d.%y".to_string(),
        }
    }
}

impl DateHeaderFormat {
    /// Parse a column header into a date, or `None` if it is not a dated
    /// column under this grammar.
    pub fn parse(&self, header: &str) -> Option<NaiveDate> {
        let stripped = header.strip_prefix(self.prefix)?;
        NaiveDate::parse_from_str(stripped, &self.format).ok()
    }
}

/// Full pipeline configuration. Every field can be overridden from the
/// JSON config file; omitted fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Confirmed-cases table: a filesystem path or an http(s) URL.
    pub cases_source: String,
    /// Deaths table: a filesystem path or an http(s) URL.
    pub deaths_source: String,
    /// Column holding the state/province name.
    pub state_column: String,
    /// Header grammar of the dated columns.
    pub date_headers: DateHeaderFormat,
    /// Region names dropped at load time.
    pub excluded_regions: Vec<String>,
    /// State whose series the model is fitted from.
    pub reference_state: String,
    /// Bound on the blocking fetch of a remote source.
    pub fetch_timeout_secs: u64,
    /// Directory receiving the results CSV and chart PNGs.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cases_source: "data/time_series_confirmed_us.csv".to_string(),
            deaths_source: "data/time_series_deaths_us.csv".to_string(),
            state_column: "Province_State".to_string(),
            date_headers: DateHeaderFormat::default(),
            excluded_regions: EXCLUDED_REGIONS.iter().map(|s| s.to_string()).collect(),
            reference_state: "New York".to_string(),
            fetch_timeout_secs: 30,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `path` if present, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}
