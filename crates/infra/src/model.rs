//! Entity types returned by the managers.
//!
//! These are read models: the user credential is deliberately absent.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RbacError, RoleId, UserId};

/// Coarse single-role hint stored in `users.role`.
///
/// Kept for compatibility; it is independent of the `user_roles` graph and is
/// never consulted when resolving permissions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LegacyRole {
    Admin,
    #[default]
    User,
}

impl LegacyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl core::fmt::Display for LegacyRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegacyRole {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(RbacError::validation(format!(
                "role must be one of: admin, user (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: LegacyRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub description: Option<String>,
}

/// A (role, module, permission) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub role_id: RoleId,
    pub module_id: ModuleId,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UserRoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// Effective permission of a user on one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePermission {
    pub module_id: ModuleId,
    pub module_name: String,
    pub permission: PermissionLevel,
}
