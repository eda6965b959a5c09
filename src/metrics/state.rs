//! Per-node job status gauges.
//!
//! The prometheus registry holds the exported values. A small key index kept
//! under a single lock mirrors which label sets exist, so the state can be
//! snapshotted and pruned without decoding the registry.

use crate::reconcile::NodeStatus;
use crate::{MonitorError, Result};
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

pub const NODE_STATUS_METRIC: &str = "logspout_client_up";
pub const NODE_STATUS_HELP: &str =
    "Nomad logspout client node status (1 = job is running, 0 = job is not running)";
pub const NODE_ID_LABEL: &str = "ClientID";
pub const NODE_NAME_LABEL: &str = "ClientName";

const PASSES_METRIC: &str = "nomad_job_monitor_passes_total";
const LAST_SUCCESS_METRIC: &str = "nomad_job_monitor_last_success_timestamp_seconds";

/// Label set of one node gauge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub node_id: String,
    pub node_name: String,
}

impl NodeKey {
    pub fn new(node_id: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_name: node_name.into(),
        }
    }
}

impl From<&NodeStatus> for NodeKey {
    fn from(status: &NodeStatus) -> Self {
        Self::new(status.node_id.clone(), status.node_name.clone())
    }
}

/// Node key to gauge value (`1` running, `0` not running).
pub type Snapshot = BTreeMap<NodeKey, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Success,
    Failure,
}

impl PassOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PassOutcome::Success => "success",
            PassOutcome::Failure => "failure",
        }
    }
}

pub struct MetricsState {
    registry: Registry,
    node_status: IntGaugeVec,
    passes: IntCounterVec,
    last_success: IntGauge,
    keys: RwLock<Snapshot>,
}

impl MetricsState {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let node_status = IntGaugeVec::new(
            Opts::new(NODE_STATUS_METRIC, NODE_STATUS_HELP),
            &[NODE_ID_LABEL, NODE_NAME_LABEL],
        )?;
        let passes = IntCounterVec::new(
            Opts::new(PASSES_METRIC, "Reconciliation passes by outcome"),
            &["outcome"],
        )?;
        let last_success = IntGauge::new(
            LAST_SUCCESS_METRIC,
            "Unix time of the last successful reconciliation pass",
        )?;

        registry.register(Box::new(node_status.clone()))?;
        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(last_success.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            node_status,
            passes,
            last_success,
            keys: RwLock::new(BTreeMap::new()),
        })
    }

    /// Set the gauge of one node, creating it if needed.
    pub async fn set_status(&self, node_id: &str, node_name: &str, running: bool) {
        let value = i64::from(running);
        let mut keys = self.keys.write().await;

        self.node_status
            .with_label_values(&[node_id, node_name])
            .set(value);
        keys.insert(NodeKey::new(node_id, node_name), value);
    }

    /// Apply the result of a pass, one node at a time.
    pub async fn apply(&self, statuses: &[NodeStatus]) {
        for status in statuses {
            debug!(
                "NodeID: {}, NodeName: {}, JobStatus: {}",
                status.node_id, status.node_name, status.job_running
            );
            self.set_status(&status.node_id, &status.node_name, status.job_running)
                .await;
        }
    }

    /// Drop every gauge whose node is not part of `statuses`. Returns how many
    /// series were removed.
    pub async fn prune_absent(&self, statuses: &[NodeStatus]) -> Result<usize> {
        let keep: HashSet<NodeKey> = statuses.iter().map(NodeKey::from).collect();
        let mut keys = self.keys.write().await;

        let stale: Vec<NodeKey> = keys
            .keys()
            .filter(|key| !keep.contains(*key))
            .cloned()
            .collect();

        for key in &stale {
            self.node_status
                .remove_label_values(&[key.node_id.as_str(), key.node_name.as_str()])?;
            keys.remove(key);
        }

        Ok(stale.len())
    }

    pub async fn export_snapshot(&self) -> Snapshot {
        self.keys.read().await.clone()
    }

    pub fn record_pass(&self, outcome: PassOutcome) {
        self.passes.with_label_values(&[outcome.as_str()]).inc();

        if outcome == PassOutcome::Success {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default();
            self.last_success.set(now);
        }
    }

    pub fn passes(&self, outcome: PassOutcome) -> u64 {
        self.passes.with_label_values(&[outcome.as_str()]).get()
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| MonitorError::MetricsError(e.to_string()))
    }
}
