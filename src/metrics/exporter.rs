//! Prometheus metrics exporter
//!
//! The recorder is installed once per process. Metrics are always reachable
//! through [`metrics_route`]; a dedicated listener is started as well when
//! the config names an address.

use crate::metrics::recorder::init_metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Standalone scrape listener. `None` serves metrics only on the API router.
    pub listen_addr: Option<SocketAddr>,
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: None,
            endpoint: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: Some(addr),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Install the Prometheus recorder and, if configured, serve it on its own port.
///
/// Subsequent calls return the existing handle without starting another listener.
pub async fn start_metrics_server(
    config: MetricsConfig,
) -> Result<&'static PrometheusHandle, MetricsError> {
    init_metrics();

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }

    let installed = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;
    let handle = PROMETHEUS_HANDLE.get_or_init(|| installed);

    if let Some(addr) = config.listen_addr {
        spawn_listener(addr, &config.endpoint).await?;
    }
    Ok(handle)
}

async fn spawn_listener(addr: SocketAddr, endpoint: &str) -> Result<(), MetricsError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MetricsError::Bind(addr, e))?;
    let app = axum::Router::new().route(endpoint, metrics_route());
    info!(%addr, endpoint, "Metrics listener started");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "Metrics listener stopped");
        }
    });
    Ok(())
}

pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Prometheus text for the current recorder, `None` before installation.
pub fn render_metrics() -> Option<String> {
    get_handle().map(PrometheusHandle::render)
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to install Prometheus recorder: {0}")]
    SetupFailed(String),

    #[error("Failed to bind metrics listener on {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),
}

/// Route serving the Prometheus text format, or 503 before the recorder is installed.
pub fn metrics_route<S>() -> axum::routing::MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    axum::routing::get(|| async { scrape() })
}

fn scrape() -> axum::response::Response {
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    let Some(body) = render_metrics() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Recorder not installed").into_response();
    };
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
