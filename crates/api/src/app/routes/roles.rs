//! `/api/roles`: role CRUD plus the members and grants of a role.
//!
//! A new role is owned by the caller; deleting the owner deletes the role.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use warden_core::RoleId;
use warden_infra::seed::ROLES_MODULE;

use crate::app::errors::ApiResult;
use crate::app::extract::{Json, Path};
use crate::app::routes::common::{guard, required_level};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route("/:id/users", get(role_members))
        .route("/:id/modules", get(role_grants))
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.roles.list().await?))
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Json(body): Json<dto::RoleRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    let role = services.roles.create(&body.name, principal.user_id()).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<RoleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.roles.get_by_id(id).await?))
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<RoleId>,
    Json(body): Json<dto::RoleRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    Ok(Json(services.roles.update(id, &body.name).await?))
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<RoleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.roles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn role_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<RoleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.roles.get_by_id(id).await?;
    Ok(Json(services.assignments.list_for_role(id).await?))
}

pub async fn role_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<RoleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, ROLES_MODULE, required_level(&method)).await?;
    services.roles.get_by_id(id).await?;
    Ok(Json(services.grants.list_for_role(id).await?))
}
