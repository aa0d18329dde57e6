//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, managers, resolver, gate and token service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: `RbacError` → JSON error responses
//! - `extract.rs`: body/path/query extractors that reject with JSON errors

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Building the router never touches the store, so it can be served before
/// the database is ready.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                // Browser front-ends on any origin; preflights never reach auth.
                .layer(CorsLayer::permissive())
                .layer(Extension(services)),
        )
}
