//! Weather API gateway with per-credential access control and a sliding
//! window rate limit.

use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key_ring;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod weather;

use handlers::{health_handler, metrics_handler, weather_handler};
use state::AppState;

// creating the router with routes
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(weather_handler))
        // route_layer only wraps the routes above it: health and metrics
        // stay open
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
