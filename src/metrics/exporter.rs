use crate::metrics::state::MetricsState;
use crate::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const METRICS_PATH: &str = "/metrics";

pub struct PrometheusExporter {
    state: Arc<MetricsState>,
    listener: TcpListener,
}

impl PrometheusExporter {
    /// Bind the listen address. Failing here is fatal for the process.
    pub async fn bind(state: Arc<MetricsState>, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { state, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve scrapes until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Serving Prometheus metrics on {}{}",
            self.listener.local_addr()?,
            METRICS_PATH
        );

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Metrics endpoint stopped");
        Ok(())
    }
}

pub fn router(state: Arc<MetricsState>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> Response {
    match state.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
