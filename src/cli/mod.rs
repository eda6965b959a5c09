use crate::config::{
    self, ClientIdentity, MonitorConfig, NomadConfig, TlsConfig, DEFAULT_JOB_NAME,
    DEFAULT_LISTEN_ADDR, DEFAULT_NOMAD_ADDR,
};
use crate::{MonitorError, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nomad-job-monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export whether a Nomad job is running on every client node as Prometheus gauges", long_about = None)]
pub struct Cli {
    #[arg(long, env = "NOMAD_ADDR", default_value = DEFAULT_NOMAD_ADDR, help = "Nomad API address")]
    pub addr: String,

    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true, help = "Nomad ACL token")]
    pub token: Option<String>,

    #[arg(long, default_value = DEFAULT_JOB_NAME, help = "Nomad job name to monitor")]
    pub job_name: String,

    #[arg(long, env = "NOMAD_SKIP_VERIFY", help = "Skip TLS certificate verification")]
    pub tls_insecure: bool,

    #[arg(long, env = "NOMAD_CACERT", help = "PEM CA certificate used to verify Nomad")]
    pub tls_ca_cert: Option<PathBuf>,

    #[arg(
        long,
        env = "NOMAD_CLIENT_CERT",
        requires = "tls_client_key",
        help = "PEM client certificate"
    )]
    pub tls_client_cert: Option<PathBuf>,

    #[arg(
        long,
        env = "NOMAD_CLIENT_KEY",
        requires = "tls_client_cert",
        help = "PEM client private key"
    )]
    pub tls_client_key: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_LISTEN_ADDR, help = "Metrics listen address")]
    pub listen: SocketAddr,

    #[arg(long, default_value = "30s", help = "Reconciliation interval (e.g. 30s, 5m, 1h)")]
    pub interval: String,

    #[arg(long, default_value = "10s", help = "Timeout for each Nomad API request")]
    pub fetch_timeout: String,

    #[arg(long, help = "Remove gauges of nodes that left the cluster")]
    pub prune_stale: bool,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<MonitorConfig> {
        let interval = config::parse_duration(&self.interval)?;
        let fetch_timeout = config::parse_duration(&self.fetch_timeout)?;

        let client_identity = match (self.tls_client_cert, self.tls_client_key) {
            (Some(cert), Some(key)) => Some(ClientIdentity { cert, key }),
            (None, None) => None,
            _ => {
                return Err(MonitorError::ConfigError(
                    "--tls-client-cert and --tls-client-key must be given together".to_string(),
                ))
            }
        };

        let config = MonitorConfig {
            nomad: NomadConfig {
                address: self.addr,
                token: self.token,
                tls: TlsConfig {
                    insecure: self.tls_insecure,
                    ca_cert: self.tls_ca_cert,
                    client_identity,
                },
                request_timeout: fetch_timeout,
            },
            job_name: self.job_name,
            listen_addr: self.listen,
            interval,
            fetch_timeout,
            prune_stale: self.prune_stale,
        };

        config.validate()?;
        Ok(config)
    }
}
