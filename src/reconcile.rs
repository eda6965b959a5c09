//! Joins the node inventory with the monitored job's allocations.
//!
//! The join key is the node display name, because that is what Nomad reports
//! on an allocation stub. Two nodes that share a name therefore always receive
//! the same status.

use crate::nomad::types::{Allocation, Node};

/// Whether the monitored job is running on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub node_id: String,
    pub node_name: String,
    pub job_running: bool,
}

/// Derive one [`NodeStatus`] per node, in input order.
///
/// A node counts as running the job when at least one allocation placed on a
/// node with the same name is in the `running` client state. Allocations that
/// reference unknown nodes are ignored.
pub fn reconcile(nodes: &[Node], allocations: &[Allocation]) -> Vec<NodeStatus> {
    nodes
        .iter()
        .map(|node| NodeStatus {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            job_running: allocations
                .iter()
                .any(|alloc| alloc.node_name == node.name && alloc.status.is_running()),
        })
        .collect()
}
