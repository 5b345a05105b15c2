use axum::routing::get;
use axum::Router;

use crate::metrics::metrics_handler;
use crate::server::AppState;

use super::handler::websocket_handler;

/// Build the room server's HTTP router: websocket upgrade, health check, and
/// a Prometheus-format metrics endpoint (spec.md §11).
pub fn create_router(state: AppState) -> Router {
    use tower_http::trace::TraceLayer;

    let cors = build_cors(&state.config.cors_origins);

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors(origins: &str) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    if origins == "*" {
        return CorsLayer::permissive();
    }

    let parsed: Vec<_> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if parsed.is_empty() {
        tracing::warn!("no valid CORS origins configured, using permissive CORS");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> &'static str {
    "OK"
}
