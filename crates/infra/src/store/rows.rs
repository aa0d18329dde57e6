//! Raw row shapes and their conversion into entity types.

use chrono::NaiveDateTime;
use sqlx::FromRow;

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RbacError, RbacResult, RoleId, UserId};

use crate::model::{Grant, Module, Role, User};

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = RbacError;

    fn try_from(row: UserRow) -> RbacResult<Self> {
        Ok(User {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            role: row.role.parse()?,
            created_at: row.created_at.and_utc(),
        })
    }
}

/// Login lookup: the only row shape that carries the credential.
#[derive(Debug, FromRow)]
pub(crate) struct CredentialRow {
    pub id: i64,
    pub password: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct RoleRow {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: RoleId::new(row.id),
            name: row.name,
            created_by: UserId::new(row.created_by),
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ModuleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<ModuleRow> for Module {
    fn from(row: ModuleRow) -> Self {
        Module {
            id: ModuleId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct GrantRow {
    pub role_id: i64,
    pub module_id: i64,
    pub permission: String,
}

impl TryFrom<GrantRow> for Grant {
    type Error = RbacError;

    fn try_from(row: GrantRow) -> RbacResult<Self> {
        Ok(Grant {
            role_id: RoleId::new(row.role_id),
            module_id: ModuleId::new(row.module_id),
            permission: parse_level(&row.permission)?,
        })
    }
}

/// Parse a stored permission. The column is constrained, so a failure here
/// means the database was edited behind our back.
pub(crate) fn parse_level(raw: &str) -> RbacResult<PermissionLevel> {
    raw.parse()
        .map_err(|_| RbacError::store(format!("unexpected permission value '{raw}' in role_modules")))
}
