//! `/api/role-modules`: grants, plus the access-decision explainer.
//!
//! Grants are part of role administration, so they are gated on the Roles
//! module.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RoleId};
use warden_infra::seed::{ROLES_MODULE, USERS_MODULE};

use crate::app::errors::ApiResult;
use crate::app::extract::{Json, Path, Query};
use crate::app::routes::common::{guard, required_level};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_grants).post(create_grant))
        .route("/explain", get(explain))
        .route(
            "/:role_id/:module_id",
            get(get_grant).put(update_grant).delete(revoke_grant),
        )
}

pub async fn list_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.grants.list().await?))
}

pub async fn create_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Json(body): Json<dto::GrantRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    let grant = services.grants.grant(body.role_id, body.module_id, body.permission).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn get_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path((role_id, module_id)): Path<(RoleId, ModuleId)>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.grants.get(role_id, module_id).await?))
}

pub async fn update_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path((role_id, module_id)): Path<(RoleId, ModuleId)>,
    Json(body): Json<dto::UpdateGrantRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.grants.update(role_id, module_id, body.permission).await?))
}

pub async fn revoke_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path((role_id, module_id)): Path<(RoleId, ModuleId)>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.grants.revoke(role_id, module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/role-modules/explain - Why would this user be allowed or denied?
///
/// Explaining your own access is always allowed; explaining someone else's
/// needs read on Users.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ExplainQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id = query.user_id.unwrap_or(principal.user_id());
    if user_id != principal.user_id() {
        guard(&services, &principal, USERS_MODULE, PermissionLevel::Read).await?;
    }

    let decision = services.gate.explain(user_id, query.module_id, query.permission).await?;
    Ok(Json(decision))
}
