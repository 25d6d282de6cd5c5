//! Axum router configuration

use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::auth::require_password;
use super::handlers::{health_check, list_songs, stream_song};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser players send credentials on cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::ORIGIN])
        .max_age(Duration::from_secs(3600));

    Router::new()
        // Catalog and streaming, password protected
        .route("/songs", get(list_songs))
        .route("/songs/{file}", get(stream_song))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_password,
        ))
        // Unauthenticated liveness probe
        .route("/health", get(health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // State
        .with_state(state)
}
