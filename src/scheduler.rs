//! Fixed-interval reconciliation loop.
//!
//! Each tick fetches the node inventory and the job's allocations, joins them
//! and writes the result into [`MetricsState`]. A pass whose fetches fail is
//! abandoned without touching the metrics; the next tick is the retry.

use crate::metrics::{MetricsState, PassOutcome};
use crate::nomad::{AllocationSource, InventorySource};
use crate::reconcile::{reconcile, NodeStatus};
use crate::{MonitorError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Summary of one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub nodes: usize,
    pub running: usize,
    pub pruned: usize,
}

pub struct Scheduler {
    inventory: Arc<dyn InventorySource>,
    allocations: Arc<dyn AllocationSource>,
    metrics: Arc<MetricsState>,
    job_name: String,
    interval: Duration,
    fetch_timeout: Duration,
    prune_stale: bool,
}

impl Scheduler {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        allocations: Arc<dyn AllocationSource>,
        metrics: Arc<MetricsState>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            allocations,
            metrics,
            job_name: job_name.into(),
            interval: crate::config::DEFAULT_INTERVAL,
            fetch_timeout: crate::config::DEFAULT_FETCH_TIMEOUT,
            prune_stale: false,
        }
    }

    /// Time between pass starts. Must be non-zero.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_prune_stale(mut self, prune: bool) -> Self {
        self.prune_stale = prune;
        self
    }

    /// Spawn the loop onto the runtime. The returned handle completes once
    /// `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Run passes until `shutdown` is cancelled. The first pass starts
    /// immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Monitoring job '{}' every {:?}",
            self.job_name, self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown during reconciliation pass, abandoning it");
                    break;
                }
                _ = self.tick() => {}
            }
        }

        info!("Reconciliation loop stopped");
    }

    /// One pass with logging and pass accounting. Errors never escape.
    async fn tick(&self) {
        let started = Instant::now();
        debug!("Updating client status...");

        match self.run_pass().await {
            Ok(report) => {
                self.metrics.record_pass(PassOutcome::Success);
                info!(
                    "Reconciled {} nodes ({} running '{}', {} pruned) in {:?}",
                    report.nodes,
                    report.running,
                    self.job_name,
                    report.pruned,
                    started.elapsed()
                );
            }
            Err(e) => {
                self.metrics.record_pass(PassOutcome::Failure);
                error!(
                    "Reconciliation pass failed, keeping previous metrics: {}",
                    e
                );
            }
        }
    }

    /// Fetch, join and publish. On any fetch error the metrics are left
    /// untouched.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let (nodes, allocations) = futures::try_join!(
            bounded("node inventory", self.fetch_timeout, self.inventory.list_nodes()),
            bounded(
                "job allocations",
                self.fetch_timeout,
                self.allocations.list_allocations(&self.job_name)
            ),
        )?;

        if nodes.is_empty() {
            warn!("Nomad returned an empty node inventory");
        }

        let statuses = reconcile(&nodes, &allocations);
        self.metrics.apply(&statuses).await;

        let pruned = if self.prune_stale {
            self.metrics.prune_absent(&statuses).await?
        } else {
            0
        };

        Ok(PassReport {
            nodes: statuses.len(),
            running: count_running(&statuses),
            pruned,
        })
    }
}

fn count_running(statuses: &[NodeStatus]) -> usize {
    statuses.iter().filter(|s| s.job_running).count()
}

async fn bounded<T>(
    source_name: &'static str,
    timeout: Duration,
    fetch: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("Failed to fetch {}: {}", source_name, e);
            Err(e)
        }
        Err(_) => Err(MonitorError::FetchTimeout {
            source_name,
            timeout,
        }),
    }
}
