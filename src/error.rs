use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Nomad API error: {0}")]
    NomadError(String),

    #[error("Request to {endpoint} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Fetching {source_name} timed out after {timeout:?}")]
    FetchTimeout {
        source_name: &'static str,
        timeout: Duration,
    },

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
