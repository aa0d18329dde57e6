//! SQLite-backed relational store.
//!
//! `Store` is the single handle to the database. It is constructed once at
//! startup and cloned into every component (the underlying pool is
//! reference-counted).
//!
//! ## Referential integrity
//!
//! Every connection is opened with `PRAGMA foreign_keys = ON`, so the
//! `ON DELETE CASCADE` clauses declared in [`schema`] are enforced by SQLite
//! itself. Deletes that cascade run inside a transaction together with the
//! triggering statement.
//!
//! ## Write transactions
//!
//! Every read-then-write unit of work goes through [`Store::begin_write`],
//! which takes SQLite's write lock up front (`BEGIN IMMEDIATE`). A deferred
//! transaction that reads first and upgrades later fails with
//! `SQLITE_BUSY` when another connection got there first; an immediate one
//! waits out the busy timeout instead, so concurrent writers serialize.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RbacError, RbacResult, RoleId, UserId};

use crate::config::StoreConfig;
use crate::model::LegacyRole;

pub(crate) mod rows;
pub mod schema;

/// Shared handle to the relational store.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect eagerly. Fails with `RbacError::Connection` if the database
    /// cannot be opened.
    pub async fn connect(config: &StoreConfig) -> RbacResult<Self> {
        let options = connect_options(config)?;
        let pool = pool_options(config)
            .connect_with(options)
            .await
            .map_err(|e| RbacError::Connection(e.to_string()))?;

        tracing::info!(url = %config.database_url, "connected to store");
        Ok(Self { pool })
    }

    /// Build the handle without touching the database.
    ///
    /// Connections are opened on first use, so a server can bind its listener
    /// and answer health checks while the database is still unreachable.
    pub fn connect_lazy(config: &StoreConfig) -> RbacResult<Self> {
        let options = connect_options(config)?;
        let pool = pool_options(config).connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Fresh private in-memory store (tests and demos).
    pub async fn in_memory() -> RbacResult<Self> {
        Self::connect(&StoreConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction that already holds the database write lock.
    pub async fn begin_write(&self) -> RbacResult<Transaction<'static, Sqlite>> {
        self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(map_sqlx_error)
    }

    /// Cheap round trip used by health checks.
    pub async fn ping(&self) -> RbacResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| RbacError::Connection(e.to_string()))
    }

    /// Close every pooled connection. Further use fails with `Connection`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn connect_options(config: &StoreConfig) -> RbacResult<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| RbacError::Connection(format!("invalid database url: {e}")))?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    Ok(if config.is_in_memory() {
        options
    } else {
        options.create_if_missing(true).journal_mode(SqliteJournalMode::Wal)
    })
}

fn pool_options(config: &StoreConfig) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.is_in_memory() {
        // Dropping the only connection would drop the database with it.
        options.idle_timeout(None).max_lifetime(None)
    } else {
        options
    }
}

/// Translate a driver error into the typed RBAC taxonomy.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RbacError {
    match err {
        sqlx::Error::Database(db) => {
            if db.is_unique_violation() {
                RbacError::Conflict(db.message().to_string())
            } else if db.is_foreign_key_violation() {
                RbacError::NotFound(format!("referenced entity does not exist ({})", db.message()))
            } else if db.is_check_violation() {
                RbacError::Validation(db.message().to_string())
            } else {
                RbacError::Store(db.message().to_string())
            }
        }
        sqlx::Error::RowNotFound => RbacError::not_found("row"),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RbacError::Connection(err.to_string())
        }
        sqlx::Error::Io(e) => RbacError::Connection(e.to_string()),
        other => RbacError::Store(other.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotent inserts
// ─────────────────────────────────────────────────────────────────────────────

/// A row for [`insert_or_ignore`].
#[derive(Debug, Clone, Copy)]
pub enum InsertRow<'a> {
    User {
        name: &'a str,
        email: &'a str,
        password_hash: &'a str,
        role: LegacyRole,
    },
    Role {
        name: &'a str,
        created_by: UserId,
    },
    Module {
        name: &'a str,
        description: Option<&'a str>,
    },
    UserRole {
        user_id: UserId,
        role_id: RoleId,
    },
    RoleModule {
        role_id: RoleId,
        module_id: ModuleId,
        permission: PermissionLevel,
    },
}

impl InsertRow<'_> {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::User { .. } => "users",
            Self::Role { .. } => "roles",
            Self::Module { .. } => "modules",
            Self::UserRole { .. } => "user_roles",
            Self::RoleModule { .. } => "role_modules",
        }
    }
}

/// Insert a row unless it collides with a unique key, in which case the
/// existing row is left untouched.
///
/// Returns `true` when a row was inserted. Only uniqueness conflicts are
/// ignored; foreign-key and check violations still fail.
pub async fn insert_or_ignore(conn: &mut SqliteConnection, row: InsertRow<'_>) -> RbacResult<bool> {
    let result = match row {
        InsertRow::User {
            name,
            email,
            password_hash,
            role,
        } => {
            sqlx::query(
                r#"
                INSERT INTO users (name, email, password, role)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .execute(&mut *conn)
            .await
        }
        InsertRow::Role { name, created_by } => {
            sqlx::query("INSERT INTO roles (name, created_by) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
                .bind(name)
                .bind(created_by.get())
                .execute(&mut *conn)
                .await
        }
        InsertRow::Module { name, description } => {
            sqlx::query("INSERT INTO modules (name, description) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
                .bind(name)
                .bind(description)
                .execute(&mut *conn)
                .await
        }
        InsertRow::UserRole { user_id, role_id } => {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
                .bind(user_id.get())
                .bind(role_id.get())
                .execute(&mut *conn)
                .await
        }
        InsertRow::RoleModule {
            role_id,
            module_id,
            permission,
        } => {
            sqlx::query(
                r#"
                INSERT INTO role_modules (role_id, module_id, permission)
                VALUES (?1, ?2, ?3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id.get())
            .bind(module_id.get())
            .bind(permission.as_str())
            .execute(&mut *conn)
            .await
        }
    };

    let done = result.map_err(map_sqlx_error)?;
    Ok(done.rows_affected() == 1)
}

/// Whether a row with `id` exists in `table`.
///
/// `table` is always one of the fixed table names, never user input.
pub(crate) async fn exists_by_id(conn: &mut SqliteConnection, table: &'static str, id: i64) -> RbacResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    let found: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_enforces_foreign_keys() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();

        let mut conn = store.pool().acquire().await.unwrap();
        let err = insert_or_ignore(
            &mut conn,
            InsertRow::Role {
                name: "Orphan",
                created_by: UserId::new(999),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RbacError::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn insert_or_ignore_keeps_existing_row() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();

        let first = insert_or_ignore(&mut conn, InsertRow::Module { name: "Users", description: Some("first") })
            .await
            .unwrap();
        let second = insert_or_ignore(&mut conn, InsertRow::Module { name: "Users", description: Some("second") })
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let description: Option<String> =
            sqlx::query_scalar("SELECT description FROM modules WHERE name = 'Users'")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(description.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn closed_store_reports_connection_error() {
        let store = Store::in_memory().await.unwrap();
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(store.ping().await, Err(RbacError::Connection(_))));
        assert!(matches!(store.begin_write().await, Err(RbacError::Connection(_))));
    }

    #[tokio::test]
    async fn lazy_store_with_unreachable_file_degrades() {
        let config = StoreConfig::new("sqlite:///nonexistent-dir/deeper/warden.db");
        let store = Store::connect_lazy(&config).unwrap();
        assert!(store.ping().await.is_err());
    }
}
