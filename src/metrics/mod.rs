pub mod exporter;
pub mod state;

pub use exporter::PrometheusExporter;
pub use state::{MetricsState, NodeKey, PassOutcome, Snapshot};
