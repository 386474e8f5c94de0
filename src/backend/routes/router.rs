/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Health check (`GET /`)
 * 2. Collaborative editing routes (WebSocket and HTTP)
 * 3. Fallback handler (404)
 *
 * # Middleware
 *
 * Every route is wrapped in an HTTP `TraceLayer` and a `CorsLayer` that
 * allows the configured frontend origin, or any origin if none is set.
 */

use axum::{
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::backend::collab::handlers::handle_health;
use crate::backend::routes::collab_routes::configure_collab_routes;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let cors = cors_layer(&app_state.config);

    let router = Router::new().route("/", get(handle_health));

    // Add collaborative editing routes
    let router = configure_collab_routes(router);

    // Fallback handler for 404
    let router = router.fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") });

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(app_state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = match config.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            tracing::warn!("FRONTEND_URL is not a valid origin ({}), allowing any origin", e);
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers(Any)
}
