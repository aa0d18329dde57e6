//! User accounts.

use std::sync::Arc;

use serde::Deserialize;

use warden_auth::CredentialHasher;
use warden_core::{RbacError, RbacResult, UserId};

use crate::model::{LegacyRole, User};
use crate::store::rows::{CredentialRow, UserRow};
use crate::store::{map_sqlx_error, Store};

use super::{validate_email, validate_name, validate_password};

const SELECT_USER: &str = "SELECT id, name, email, role, created_at FROM users";

/// Registration input. `password` is plaintext and hashed before it is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<LegacyRole>,
}

/// Profile update; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<LegacyRole>,
}

#[derive(Clone)]
pub struct UserManager {
    store: Store,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserManager {
    pub fn new(store: Store, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn create(&self, input: NewUser) -> RbacResult<User> {
        let name = validate_name("name", &input.name)?;
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;
        let role = input.role.unwrap_or_default();

        // Cheap pre-check before paying for the hash.
        if self.email_taken(&email, None).await? {
            return Err(RbacError::conflict(format!("email '{email}' is already registered")));
        }
        let password_hash = self.hash(input.password).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(self.store.pool())
        .await
        .map_err(|e| match map_sqlx_error(e) {
            RbacError::Conflict(_) => RbacError::conflict(format!("email '{email}' is already registered")),
            other => other,
        })?;

        tracing::info!(user_id = id, %email, "user created");
        self.get_by_id(UserId::new(id)).await
    }

    pub async fn list(&self) -> RbacResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn get_by_id(&self, id: UserId) -> RbacResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id.get())
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.ok_or_else(|| RbacError::not_found(format!("user {id}")))?.try_into()
    }

    pub async fn update(&self, id: UserId, update: UserUpdate) -> RbacResult<User> {
        let current = self.get_by_id(id).await?;

        let name = match update.name {
            Some(name) => validate_name("name", &name)?,
            None => current.name,
        };
        let email = match update.email {
            Some(email) => validate_email(&email)?,
            None => current.email,
        };
        let role = update.role.unwrap_or(current.role);

        if self.email_taken(&email, Some(id)).await? {
            return Err(RbacError::conflict(format!("email '{email}' is already registered")));
        }

        let done = sqlx::query("UPDATE users SET name = ?1, email = ?2, role = ?3 WHERE id = ?4")
            .bind(&name)
            .bind(&email)
            .bind(role.as_str())
            .bind(id.get())
            .execute(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("user {id}")));
        }

        self.get_by_id(id).await
    }

    pub async fn change_password(&self, id: UserId, new_password: &str) -> RbacResult<()> {
        validate_password(new_password)?;
        let password_hash = self.hash(new_password.to_string()).await?;

        let done = sqlx::query("UPDATE users SET password = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(id.get())
            .execute(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("user {id}")));
        }

        tracing::info!(user_id = %id, "password changed");
        Ok(())
    }

    /// Delete a user. Their role assignments go with them, and so does every
    /// role they created (with that role's grants and assignments).
    pub async fn delete(&self, id: UserId) -> RbacResult<()> {
        let mut tx = self.store.begin_write().await?;

        let done = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("user {id}")));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> RbacResult<User> {
        let email = email.trim().to_lowercase();
        let row: Option<CredentialRow> = sqlx::query_as("SELECT id, password FROM users WHERE email = ?1")
            .bind(&email)
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            tracing::info!(%email, "login rejected: unknown email");
            return Err(RbacError::Unauthorized);
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &row.password))
            .await
            .map_err(|e| RbacError::store(format!("credential check aborted: {e}")))??;

        if !matched {
            tracing::info!(%email, "login rejected: bad password");
            return Err(RbacError::Unauthorized);
        }

        self.get_by_id(UserId::new(row.id)).await
    }

    async fn email_taken(&self, email: &str, except: Option<UserId>) -> RbacResult<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id != ?2)")
            .bind(email)
            .bind(except.map(|id| id.get()).unwrap_or(0))
            .fetch_one(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(taken)
    }

    /// Hashing is CPU-bound; keep it off the async workers.
    async fn hash(&self, plaintext: String) -> RbacResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| RbacError::store(format!("credential hashing aborted: {e}")))?
    }
}

impl core::fmt::Debug for UserManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserManager").field("store", &self.store).finish_non_exhaustive()
    }
}
