//! `/api/modules`: the protectable feature areas.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use warden_core::ModuleId;
use warden_infra::seed::MODULES_MODULE;

use crate::app::errors::ApiResult;
use crate::app::extract::{Json, Path};
use crate::app::routes::common::{guard, required_level};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route("/:id", get(get_module).put(update_module).delete(delete_module))
}

pub async fn list_modules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, MODULES_MODULE, required_level(&method)).await?;
    Ok(Json(services.modules.list().await?))
}

pub async fn create_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Json(body): Json<dto::ModuleRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, MODULES_MODULE, required_level(&method)).await?;
    let module = services.modules.create(&body.name, body.description.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

pub async fn get_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<ModuleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, MODULES_MODULE, required_level(&method)).await?;
    Ok(Json(services.modules.get_by_id(id).await?))
}

pub async fn update_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<ModuleId>,
    Json(body): Json<dto::ModuleRequest>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, MODULES_MODULE, required_level(&method)).await?;
    let module = services.modules.update(id, &body.name, body.description.as_deref()).await?;
    Ok(Json(module))
}

pub async fn delete_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    method: Method,
    Path(id): Path<ModuleId>,
) -> ApiResult<impl IntoResponse> {
    guard(&services, &principal, MODULES_MODULE, required_level(&method)).await?;
    services.modules.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
