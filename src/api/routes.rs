//! API Routes
//!
//! Configures the Axum router. The root path is the health check; every
//! other path is a cache key.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    bad_method_handler, delete_handler, exists_handler, health_handler, insert_handler,
    lookup_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /`, `HEAD /` - Health check
/// - `GET /<key>` - Retrieve a value
/// - `HEAD /<key>` - Check that a key exists
/// - `POST /<key>` - Store the request body under a key
/// - `DELETE /<key>` - Delete a key
///
/// Any other method answers 400.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_handler).fallback(bad_method_handler))
        .route(
            "/*key",
            get(lookup_handler)
                .head(exists_handler)
                .post(insert_handler)
                .delete(delete_handler)
                .fallback(bad_method_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
