//! Modules: named, protectable feature areas.

use warden_core::{ModuleId, RbacError, RbacResult};

use crate::model::Module;
use crate::store::rows::ModuleRow;
use crate::store::{exists_by_id, map_sqlx_error, Store};

use super::validate_name;

#[derive(Debug, Clone)]
pub struct ModuleManager {
    store: Store,
}

impl ModuleManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> RbacResult<Module> {
        let name = validate_name("name", name)?;
        let description = normalize_description(description);
        let mut tx = self.store.begin_write().await?;

        if name_taken(&mut tx, &name, None).await? {
            return Err(RbacError::conflict(format!("module '{name}' already exists")));
        }

        let id: i64 = sqlx::query_scalar("INSERT INTO modules (name, description) VALUES (?1, ?2) RETURNING id")
            .bind(&name)
            .bind(description.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                RbacError::Conflict(_) => RbacError::conflict(format!("module '{name}' already exists")),
                other => other,
            })?;

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(module_id = id, %name, "module created");

        Ok(Module {
            id: ModuleId::new(id),
            name,
            description,
        })
    }

    pub async fn list(&self) -> RbacResult<Vec<Module>> {
        let rows: Vec<ModuleRow> = sqlx::query_as("SELECT id, name, description FROM modules ORDER BY id")
            .fetch_all(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Module::from).collect())
    }

    pub async fn get_by_id(&self, id: ModuleId) -> RbacResult<Module> {
        let row: Option<ModuleRow> = sqlx::query_as("SELECT id, name, description FROM modules WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Module::from).ok_or_else(|| RbacError::not_found(format!("module {id}")))
    }

    pub async fn find_by_name(&self, name: &str) -> RbacResult<Option<Module>> {
        let row: Option<ModuleRow> = sqlx::query_as("SELECT id, name, description FROM modules WHERE name = ?1")
            .bind(name.trim())
            .fetch_optional(self.store.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Module::from))
    }

    /// Replace name and description.
    pub async fn update(&self, id: ModuleId, name: &str, description: Option<&str>) -> RbacResult<Module> {
        let name = validate_name("name", name)?;
        let description = normalize_description(description);
        let mut tx = self.store.begin_write().await?;

        if !exists_by_id(&mut tx, "modules", id.get()).await? {
            return Err(RbacError::not_found(format!("module {id}")));
        }
        if name_taken(&mut tx, &name, Some(id)).await? {
            return Err(RbacError::conflict(format!("module '{name}' already exists")));
        }

        sqlx::query("UPDATE modules SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&name)
            .bind(description.as_deref())
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Module { id, name, description })
    }

    /// Delete a module and every grant that references it.
    pub async fn delete(&self, id: ModuleId) -> RbacResult<()> {
        let mut tx = self.store.begin_write().await?;

        let done = sqlx::query("DELETE FROM modules WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(RbacError::not_found(format!("module {id}")));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(module_id = %id, "module deleted");
        Ok(())
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}

async fn name_taken(conn: &mut sqlx::SqliteConnection, name: &str, except: Option<ModuleId>) -> RbacResult<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM modules WHERE name = ?1 AND id != ?2)")
        .bind(name)
        .bind(except.map(|id| id.get()).unwrap_or(0))
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(taken)
}
