use serde::{Deserialize, Serialize};
use std::fmt;

/// A Nomad client node as seen in the node inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Client-side lifecycle status of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Lost,
    #[serde(other)]
    Unknown,
}

impl AllocationStatus {
    pub fn is_running(self) -> bool {
        matches!(self, AllocationStatus::Running)
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationStatus::Pending => "pending",
            AllocationStatus::Running => "running",
            AllocationStatus::Complete => "complete",
            AllocationStatus::Failed => "failed",
            AllocationStatus::Lost => "lost",
            AllocationStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Placement of one instance of the monitored job onto a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub node_name: String,
    pub status: AllocationStatus,
}

impl Allocation {
    pub fn new(node_name: impl Into<String>, status: AllocationStatus) -> Self {
        Self {
            node_name: node_name.into(),
            status,
        }
    }
}

/// Entry of `GET /v1/nodes`. Only the fields the monitor needs are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeListStub {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl From<NodeListStub> for Node {
    fn from(stub: NodeListStub) -> Self {
        Self {
            id: stub.id,
            name: stub.name,
        }
    }
}

/// Entry of `GET /v1/job/:job_id/allocations`.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationListStub {
    #[serde(rename = "NodeName", default)]
    pub node_name: String,
    #[serde(rename = "ClientStatus", default = "unknown_status")]
    pub client_status: AllocationStatus,
}

fn unknown_status() -> AllocationStatus {
    AllocationStatus::Unknown
}

impl From<AllocationListStub> for Allocation {
    fn from(stub: AllocationListStub) -> Self {
        Self {
            node_name: stub.node_name,
            status: stub.client_status,
        }
    }
}
