use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::app::services::AppServices;

/// Liveness plus store reachability.
///
/// Always answers 200: the process is alive even when the database is not.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let database_up = match services.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            false
        }
    };

    Json(json!({
        "status": if database_up { "healthy" } else { "degraded" },
        "database": if database_up { "available" } else { "unavailable" },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "Hello World" }))
}
