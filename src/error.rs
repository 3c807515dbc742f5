// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Scrape target unreachable or its table is missing.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
    /// Requested ticker, indicator or date range returned no rows.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DashboardError {
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, DashboardError::DataUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
