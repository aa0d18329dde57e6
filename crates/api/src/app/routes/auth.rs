//! `/api/auth`: registration, login and the caller's own profile.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use warden_core::RbacError;
use warden_infra::NewUser;

use crate::app::errors::ApiResult;
use crate::app::extract::Json;
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

/// POST /api/auth/register - Self-service sign-up.
///
/// The new account holds no roles, so it can do nothing protected until an
/// administrator assigns one. A legacy `role` tag in the body is ignored.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let user = services.users.create(NewUser { role: None, ..body }).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login - Exchange email and password for a bearer token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = services.users.authenticate(&body.email, &body.password).await?;

    let now = Utc::now();
    let token = services
        .tokens
        .issue(user.id, &user.email, now)
        .map_err(|e| RbacError::store(format!("token issuance failed: {e}")))?;
    let expires_at = now + services.tokens.ttl();

    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(Json(dto::TokenResponse {
        token,
        token_type: "Bearer",
        expires_at,
        user,
    }))
}

/// GET /api/auth/me - The caller and their effective permissions.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    // A token can outlive its user.
    let user = services.users.get_by_id(principal.user_id()).await.map_err(|e| match e {
        RbacError::NotFound(_) => RbacError::Unauthorized,
        other => other,
    })?;
    let permissions = services.resolver.effective_permissions(user.id).await?;
    Ok(Json(dto::MeResponse { user, permissions }))
}
