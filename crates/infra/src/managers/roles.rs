//! Roles: uniquely named permission bundles owned by their creator.

use warden_core::{RbacError, RbacResult, RoleId, UserId};

use crate::model::Role;
use crate::store::rows::RoleRow;
use crate::store::{exists_by_id, map_sqlx_error, Store};

use super::validate_name;

#[derive(Debug, Clone)]
pub struct RoleManager {
    store: Store,
}

impl RoleManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, created_by: UserId) -> RbacResult<Role> {
        let name = validate_name("name", name)?;
        let mut tx = self.store.begin_write().await?;

        if !exists_by_id(&mut tx, "users", created_by.get()).await? {
            return Err(RbacError::not_found(format!("user {created_by}")));
        }
        if name_taken(&mut tx, &name, None).await? {
            return Err(RbacError::conflict(format!("role '{name}' already exists")));
        }

        let id: i64 = sqlx::query_scalar("INSERT INTO roles (name, created_by) VALUES (?1, ?2) RETURNING id")
            .bind(&name)
            .bind(created_by.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                RbacError::Conflict(_) => RbacError::conflict(format!("role '{name}' already exists")),
                other => other,
            })?;

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(role_id = id, %name, %created_by, "role created");

        Ok(Role {
            id: RoleId::new(id),
            name,
            created_by,
        })
    }

    pub async fn list(&self) -> RbacResult<Vec<Role>> {
        let rows: Vec<RoleRow> = sqlx::query_as("SELECT id, name, created_by FROM roles ORDER BY id")
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    pub async fn get_by_id(&self, id: RoleId) -> RbacResult<Role> {
        let row: Option<RoleRow> = sqlx::query_as("SELECT id, name, created_by FROM roles WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Role::from).ok_or_else(|| RbacError::not_found(format!("role {id}")))
    }

    /// Rename a role. Ownership never changes.
    pub async fn update(&self, id: RoleId, name: &str) -> RbacResult<Role> {
        let name = validate_name("name", name)?;
        let mut tx = self.store.begin_write().await?;

        if !exists_by_id(&mut tx, "roles", id.get()).await? {
            return Err(RbacError::not_found(format!("role {id}")));
        }
        if name_taken(&mut tx, &name, Some(id)).await? {
            return Err(RbacError::conflict(format!("role '{name}' already exists")));
        }

        sqlx::query("UPDATE roles SET name = ?1 WHERE id = ?2")
            .bind(&name)
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        self.get_by_id(id).await
    }

    /// Delete a role together with its assignments and grants.
    pub async fn delete(&self, id: RoleId) -> RbacResult<()> {
        let mut tx = self.store.begin_write().await?;

        let done = sqlx::query("DELETE FROM roles WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("role {id}")));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(role_id = %id, "role deleted");
        Ok(())
    }
}

async fn name_taken(conn: &mut sqlx::SqliteConnection, name: &str, except: Option<RoleId>) -> RbacResult<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?1 AND id != ?2)")
        .bind(name)
        .bind(except.map(|id| id.get()).unwrap_or(0))
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(taken)
}
