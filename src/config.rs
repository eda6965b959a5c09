//! Validated runtime configuration.
//!
//! Built from the command line by [`crate::cli::Cli::into_config`]; the rest of
//! the crate only ever sees these types.

use crate::{MonitorError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_NOMAD_ADDR: &str = "http://localhost:4646";
pub const DEFAULT_JOB_NAME: &str = "signoz-logspout";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How the Nomad client establishes trust with the API server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Skip server certificate verification.
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_identity: Option<ClientIdentity>,
}

/// PEM encoded client certificate and its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NomadConfig {
    pub address: String,
    pub token: Option<String>,
    pub tls: TlsConfig,
    /// Upper bound for a single API request.
    pub request_timeout: Duration,
}

impl Default for NomadConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_NOMAD_ADDR.to_string(),
            token: None,
            tls: TlsConfig::default(),
            request_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub nomad: NomadConfig,
    pub job_name: String,
    pub listen_addr: SocketAddr,
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub prune_stale: bool,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nomad.address.trim().is_empty() {
            return Err(MonitorError::ConfigError(
                "Nomad address must not be empty".to_string(),
            ));
        }
        if self.job_name.trim().is_empty() {
            return Err(MonitorError::ConfigError(
                "Job name must not be empty".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(MonitorError::ConfigError(
                "Reconciliation interval must be greater than zero".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(MonitorError::ConfigError(
                "Fetch timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a duration such as `500ms`, `30s`, `5m` or `1h`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (num, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000u64)
    } else {
        return Err(MonitorError::ConfigError(format!(
            "Invalid duration '{}'. Use: 30s, 5m, 1h, 500ms",
            s
        )));
    };

    let value: u64 = num
        .trim()
        .parse()
        .map_err(|_| MonitorError::ConfigError(format!("Invalid duration number in '{}'", s)))?;

    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| MonitorError::ConfigError(format!("Duration '{}' is too large", s)))
}
