use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RoleId, UserId};
use warden_infra::{ModulePermission, User};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ModuleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub role_id: RoleId,
    pub module_id: ModuleId,
    pub permission: PermissionLevel,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGrantRequest {
    pub permission: PermissionLevel,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: RoleId,
}

/// `GET /api/role-modules/explain` query. `user_id` defaults to the caller.
#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub user_id: Option<UserId>,
    pub module_id: ModuleId,
    pub permission: PermissionLevel,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub permissions: Vec<ModulePermission>,
}
