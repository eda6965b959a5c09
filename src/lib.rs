pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod nomad;
pub mod reconcile;
pub mod scheduler;

pub use error::{MonitorError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
