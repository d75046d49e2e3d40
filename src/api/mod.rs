mod error;
mod rest;
mod types;
mod websocket;

pub use error::{ApiError, ApiResult};
pub use rest::RestApi;
pub use types::*;
pub use websocket::websocket_handler;

use crate::coordinator::UploadCoordinator;
use crate::metrics::metrics_route;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create a complete API server with REST, WebSocket and metrics routes
pub fn create_api_server(coordinator: UploadCoordinator) -> Router {
    let rest_api = RestApi::new(coordinator.clone());
    let coordinator_arc = Arc::new(coordinator);

    // Configure CORS to allow frontend requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_router = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(coordinator_arc);

    Router::new()
        .merge(rest_api.router())
        .merge(ws_router)
        .route("/metrics", metrics_route())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
