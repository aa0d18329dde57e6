//! Role assignments: which users hold which roles.

use warden_core::{RbacError, RbacResult, RoleId, UserId};

use crate::model::{Role, User, UserRoleAssignment};
use crate::store::rows::{RoleRow, UserRow};
use crate::store::{exists_by_id, map_sqlx_error, Store};

#[derive(Debug, Clone)]
pub struct UserRoleManager {
    store: Store,
}

impl UserRoleManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn assign(&self, user_id: UserId, role_id: RoleId) -> RbacResult<UserRoleAssignment> {
        let mut tx = self.store.begin_write().await?;

        if !exists_by_id(&mut tx, "users", user_id.get()).await? {
            return Err(RbacError::not_found(format!("user {user_id}")));
        }
        if !exists_by_id(&mut tx, "roles", role_id.get()).await? {
            return Err(RbacError::not_found(format!("role {role_id}")));
        }

        let done = sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
            .bind(user_id.get())
            .bind(role_id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::conflict(format!("user {user_id} already holds role {role_id}")));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(%user_id, %role_id, "role assigned");
        Ok(UserRoleAssignment { user_id, role_id })
    }

    pub async fn list(&self) -> RbacResult<Vec<UserRoleAssignment>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT user_id, role_id FROM user_roles ORDER BY user_id, role_id")
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|(user_id, role_id)| UserRoleAssignment {
                user_id: UserId::new(user_id),
                role_id: RoleId::new(role_id),
            })
            .collect())
    }

    /// Roles held by a user.
    pub async fn list_for_user(&self, user_id: UserId) -> RbacResult<Vec<Role>> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.created_by
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?1
            ORDER BY r.id
            "#,
        )
        .bind(user_id.get())
        .fetch_all(self.store.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    /// Users holding a role.
    pub async fn list_for_role(&self, role_id: RoleId) -> RbacResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.name, u.email, u.role, u.created_at
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            WHERE ur.role_id = ?1
            ORDER BY u.id
            "#,
        )
        .bind(role_id.get())
        .fetch_all(self.store.pool())
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn unassign(&self, user_id: UserId, role_id: RoleId) -> RbacResult<()> {
        let done = sqlx::query("DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2")
            .bind(user_id.get())
            .bind(role_id.get())
            .execute(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("user {user_id} does not hold role {role_id}")));
        }

        tracing::info!(%user_id, %role_id, "role unassigned");
        Ok(())
    }
}
