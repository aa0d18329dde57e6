//! `/api/users`: user accounts, their role assignments and effective permissions.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};

use warden_auth::PermissionLevel;
use warden_core::{RoleId, UserId};
use warden_infra::seed::{ROLES_MODULE, USERS_MODULE};
use warden_infra::{NewUser, UserUpdate};

use crate::app::errors::ApiResult;
use crate::app::extract::{Json, Path};
use crate::app::routes::common::{guard, required_level};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/password", put(change_password))
        .route("/:id/permissions", get(user_permissions))
        .route("/:id/roles", get(user_roles).post(assign_role))
        .route("/:id/roles/:role_id", delete(unassign_role))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    Ok(Json(services.users.list().await?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Json(body): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    let user = services.users.create(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    if principal.user_id() != id {
        guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    }
    Ok(Json(services.users.get_by_id(id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    Ok(Json(services.users.update(id, body).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Users may always change their own password.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if principal.user_id() != id {
        guard(&services, &principal, USERS_MODULE, required_level(&method)).await?;
    }
    services.users.change_password(id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    if principal.user_id() != id {
        guard(&services, &principal, USERS_MODULE, PermissionLevel::Read).await?;
    }
    // Distinguish "no such user" from "no permissions".
    services.users.get_by_id(id).await?;
    Ok(Json(services.resolver.effective_permissions(id).await?))
}

pub async fn user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.users.get_by_id(id).await?;
    Ok(Json(services.assignments.list_for_user(id).await?))
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<UserId>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    let assignment = services.assignments.assign(id, body.role_id).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn unassign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path((id, role_id)): Path<(UserId, RoleId)>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.assignments.unassign(id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
