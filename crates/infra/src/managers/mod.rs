//! Entity managers: validated CRUD over the five tables.
//!
//! Conventions shared by every manager:
//! - uniqueness is checked before insert and reported as `Conflict`; a racing
//!   insert that still trips the unique index maps to `Conflict` as well;
//! - referenced rows are checked before insert and reported as `NotFound`;
//! - deletes rely on the schema's cascades, run in a transaction, and report
//!   `NotFound` when nothing was deleted.

pub mod modules;
pub mod role_modules;
pub mod roles;
pub mod user_roles;
pub mod users;

pub use modules::ModuleManager;
pub use role_modules::RoleModuleManager;
pub use roles::RoleManager;
pub use user_roles::UserRoleManager;
pub use users::{NewUser, UserManager, UserUpdate};

use warden_core::{RbacError, RbacResult};

/// Column width of every name/email column.
pub const MAX_NAME_LEN: usize = 100;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trim and check a required short text field.
pub(crate) fn validate_name(field: &str, value: &str) -> RbacResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RbacError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(RbacError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

pub(crate) fn validate_email(value: &str) -> RbacResult<String> {
    let email = validate_name("email", value)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(RbacError::validation("email must look like name@domain")),
    }
}

pub(crate) fn validate_password(value: &str) -> RbacResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(RbacError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for manager tests.

    use std::sync::Arc;

    use warden_auth::BcryptHasher;

    use super::*;
    use crate::config::StoreConfig;
    use crate::store::Store;

    pub async fn store() -> Store {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();
        store
    }

    /// File-backed store with a multi-connection pool, for tests that need
    /// real concurrency. Keep the directory alive as long as the store.
    pub async fn file_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("warden.db").display());
        let store = Store::connect(&StoreConfig::new(url)).await.unwrap();
        store.create_if_absent().await.unwrap();
        (dir, store)
    }

    pub fn users(store: &Store) -> UserManager {
        UserManager::new(store.clone(), Arc::new(BcryptHasher::new(4)))
    }

    pub fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "password1".to_string(),
            role: None,
        }
    }
}
