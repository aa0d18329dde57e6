//! Table definitions.
//!
//! Column semantics follow the persisted schema: `users.role` is restricted to
//! `admin`/`user`, `role_modules.permission` to `read`/`write`/`delete`, and
//! every foreign key cascades on delete.

use warden_core::{RbacError, RbacResult};

use super::Store;

/// DDL statements, applied in order. Each is idempotent.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL CHECK (length(name) <= 100),
        email       TEXT    NOT NULL UNIQUE CHECK (length(email) <= 100),
        password    TEXT    NOT NULL,
        role        TEXT    NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
        created_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL UNIQUE CHECK (length(name) <= 100),
        created_by  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS modules (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL UNIQUE CHECK (length(name) <= 100),
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role_id     INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, role_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_modules (
        role_id     INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        module_id   INTEGER NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
        permission  TEXT    NOT NULL CHECK (permission IN ('read', 'write', 'delete')),
        PRIMARY KEY (role_id, module_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_roles_created_by ON roles (created_by)",
    "CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles (role_id)",
    "CREATE INDEX IF NOT EXISTS idx_role_modules_module ON role_modules (module_id)",
];

pub const TABLES: [&str; 5] = ["users", "roles", "modules", "user_roles", "role_modules"];

impl Store {
    /// Create every table that does not exist yet, in one transaction.
    ///
    /// Safe to call on every start. A failure is fatal to startup: nothing
    /// else can run without the tables.
    pub async fn create_if_absent(&self) -> RbacResult<()> {
        let mut tx = self.begin_write().await?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| RbacError::Schema(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| RbacError::Schema(e.to_string()))?;
        tracing::debug!("schema ready");
        Ok(())
    }

    /// Row count per table, in [`TABLES`] order.
    pub async fn table_counts(&self) -> RbacResult<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            let count: i64 = sqlx::query_scalar(&sql)
                .fetch_one(self.pool())
                .await
                .map_err(super::map_sqlx_error)?;
            counts.push((table, count));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_if_absent_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();
        store.create_if_absent().await.unwrap();

        let counts = store.table_counts().await.unwrap();
        assert_eq!(counts.len(), TABLES.len());
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn permission_column_rejects_unknown_levels() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();

        sqlx::query("INSERT INTO users (name, email, password) VALUES ('a', 'a@x.io', 'h')")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO roles (name, created_by) VALUES ('r', 1)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO modules (name) VALUES ('m')")
            .execute(store.pool())
            .await
            .unwrap();

        let err = sqlx::query("INSERT INTO role_modules (role_id, module_id, permission) VALUES (1, 1, 'admin')")
            .execute(store.pool())
            .await
            .unwrap_err();
        assert!(matches!(super::super::map_sqlx_error(err), RbacError::Validation(_)));
    }

    #[tokio::test]
    async fn closed_store_fails_schema_with_connection_error() {
        let store = Store::in_memory().await.unwrap();
        store.close().await;
        assert!(matches!(store.create_if_absent().await, Err(RbacError::Connection(_))));
    }
}
