pub mod client;
pub mod source;
pub mod types;

pub use client::NomadClient;
pub use source::{AllocationSource, InventorySource};
pub use types::{Allocation, AllocationStatus, Node};
