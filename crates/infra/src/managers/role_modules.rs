//! Grants: the permission level a role holds on a module.
//!
//! A role holds at most one level per module. Changing the level is an
//! update of that single row, never a second grant.

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RbacError, RbacResult, RoleId};

use crate::model::Grant;
use crate::store::rows::GrantRow;
use crate::store::{exists_by_id, map_sqlx_error, Store};

const SELECT_GRANT: &str = "SELECT role_id, module_id, permission FROM role_modules";

#[derive(Debug, Clone)]
pub struct RoleModuleManager {
    store: Store,
}

impl RoleModuleManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn grant(&self, role_id: RoleId, module_id: ModuleId, permission: PermissionLevel) -> RbacResult<Grant> {
        let mut tx = self.store.begin_write().await?;

        if !exists_by_id(&mut tx, "roles", role_id.get()).await? {
            return Err(RbacError::not_found(format!("role {role_id}")));
        }
        if !exists_by_id(&mut tx, "modules", module_id.get()).await? {
            return Err(RbacError::not_found(format!("module {module_id}")));
        }

        let already: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM role_modules WHERE role_id = ?1 AND module_id = ?2)")
                .bind(role_id.get())
                .bind(module_id.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if already {
            return Err(RbacError::conflict(format!(
                "role {role_id} already has a grant on module {module_id}"
            )));
        }

        sqlx::query("INSERT INTO role_modules (role_id, module_id, permission) VALUES (?1, ?2, ?3)")
            .bind(role_id.get())
            .bind(module_id.get())
            .bind(permission.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(%role_id, %module_id, %permission, "grant created");

        Ok(Grant {
            role_id,
            module_id,
            permission,
        })
    }

    pub async fn list(&self) -> RbacResult<Vec<Grant>> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!("{SELECT_GRANT} ORDER BY role_id, module_id"))
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(Grant::try_from).collect()
    }

    pub async fn list_for_role(&self, role_id: RoleId) -> RbacResult<Vec<Grant>> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!("{SELECT_GRANT} WHERE role_id = ?1 ORDER BY module_id"))
            .bind(role_id.get())
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(Grant::try_from).collect()
    }

    pub async fn get(&self, role_id: RoleId, module_id: ModuleId) -> RbacResult<Grant> {
        let row: Option<GrantRow> = sqlx::query_as(&format!("{SELECT_GRANT} WHERE role_id = ?1 AND module_id = ?2"))
            .bind(role_id.get())
            .bind(module_id.get())
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.ok_or_else(|| RbacError::not_found(format!("grant for role {role_id} on module {module_id}")))?
            .try_into()
    }

    /// Upgrade or downgrade an existing grant.
    pub async fn update(&self, role_id: RoleId, module_id: ModuleId, permission: PermissionLevel) -> RbacResult<Grant> {
        let done = sqlx::query("UPDATE role_modules SET permission = ?1 WHERE role_id = ?2 AND module_id = ?3")
            .bind(permission.as_str())
            .bind(role_id.get())
            .bind(module_id.get())
            .execute(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("grant for role {role_id} on module {module_id}")));
        }

        tracing::info!(%role_id, %module_id, %permission, "grant updated");
        Ok(Grant {
            role_id,
            module_id,
            permission,
        })
    }

    pub async fn revoke(&self, role_id: RoleId, module_id: ModuleId) -> RbacResult<()> {
        let done = sqlx::query("DELETE FROM role_modules WHERE role_id = ?1 AND module_id = ?2")
            .bind(role_id.get())
            .bind(module_id.get())
            .execute(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("grant for role {role_id} on module {module_id}")));
        }

        tracing::info!(%role_id, %module_id, "grant revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::{testing, ModuleManager, RoleManager};

    async fn fixture() -> (RoleModuleManager, RoleId, ModuleId) {
        let store = testing::store().await;
        let owner = testing::users(&store)
            .create(testing::new_user("Owner", "owner@example.com"))
            .await
            .unwrap();
        let role = RoleManager::new(store.clone()).create("Temp", owner.id).await.unwrap();
        let module = ModuleManager::new(store.clone()).create("Modules", None).await.unwrap();
        (RoleModuleManager::new(store), role.id, module.id)
    }

    #[tokio::test]
    async fn one_grant_per_role_and_module() {
        let (grants, role, module) = fixture().await;

        grants.grant(role, module, PermissionLevel::Read).await.unwrap();
        let err = grants.grant(role, module, PermissionLevel::Write).await.unwrap_err();
        assert!(matches!(err, RbacError::Conflict(_)));

        let updated = grants.update(role, module, PermissionLevel::Delete).await.unwrap();
        assert_eq!(updated.permission, PermissionLevel::Delete);
        assert_eq!(grants.get(role, module).await.unwrap(), updated);
        assert_eq!(grants.list().await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn grant_requires_existing_role_and_module() {
        let (grants, role, module) = fixture().await;

        let err = grants.grant(RoleId::new(99), module, PermissionLevel::Read).await.unwrap_err();
        assert!(matches!(err, RbacError::NotFound(msg) if msg.contains("role")));
        let err = grants.grant(role, ModuleId::new(99), PermissionLevel::Read).await.unwrap_err();
        assert!(matches!(err, RbacError::NotFound(msg) if msg.contains("module")));
        assert!(grants.list_for_role(role).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn revoke_and_update_missing_grant_are_not_found() {
        let (grants, role, module) = fixture().await;

        assert!(matches!(grants.revoke(role, module).await, Err(RbacError::NotFound(_))));
        assert!(matches!(
            grants.update(role, module, PermissionLevel::Read).await,
            Err(RbacError::NotFound(_))
        ));

        grants.grant(role, module, PermissionLevel::Read).await.unwrap();
        grants.revoke(role, module).await.unwrap();
        assert!(matches!(grants.get(role, module).await, Err(RbacError::NotFound(_))));
    }
}
