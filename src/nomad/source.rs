use crate::nomad::types::{Allocation, Node};
use crate::Result;
use async_trait::async_trait;

/// Supplies the current node inventory of the cluster.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Supplies the allocations of a single job.
#[async_trait]
pub trait AllocationSource: Send + Sync {
    async fn list_allocations(&self, job_name: &str) -> Result<Vec<Allocation>>;
}
