use clap::Parser;
use nomad_job_monitor::cli::Cli;
use nomad_job_monitor::metrics::{MetricsState, PrometheusExporter};
use nomad_job_monitor::nomad::NomadClient;
use nomad_job_monitor::scheduler::Scheduler;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Starting nomad-job-monitor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    use anyhow::Context;

    let config = cli.into_config().context("Invalid configuration")?;

    if config.nomad.tls.insecure {
        warn!("TLS certificate verification is disabled");
    }

    let client = Arc::new(NomadClient::new(&config.nomad).context("Failed to create Nomad client")?);
    let metrics = Arc::new(MetricsState::new().context("Failed to initialize metrics")?);

    let exporter = PrometheusExporter::bind(metrics.clone(), config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind metrics endpoint on {}", config.listen_addr))?;

    let shutdown = CancellationToken::new();

    let scheduler = Scheduler::new(client.clone(), client, metrics, config.job_name.clone())
        .with_interval(config.interval)
        .with_fetch_timeout(config.fetch_timeout)
        .with_prune_stale(config.prune_stale)
        .spawn(shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let served = exporter.serve(shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!("Reconciliation loop panicked: {}", e);
    }

    served.context("Metrics endpoint failed")?;
    info!("nomad-job-monitor stopped");
    Ok(())
}
