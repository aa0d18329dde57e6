use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod common;
pub mod modules;
pub mod role_modules;
pub mod roles;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .nest("/api/users", users::router())
        .nest("/api/roles", roles::router())
        .nest("/api/modules", modules::router())
        .nest("/api/role-modules", role_modules::router())
}

/// Router for endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::health))
        .route("/health", get(system::health))
        .route("/hello", get(system::hello))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
}
