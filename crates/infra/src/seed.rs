//! First-run bootstrap: schema plus default users, roles, modules and grants.
//!
//! ## Failure policy
//!
//! - Schema creation failing is fatal and returned to the caller.
//! - Seed *data* failing is logged and swallowed: the whole data transaction
//!   rolls back and [`SeedOutcome::Skipped`] is returned. Callers must not
//!   assume the defaults exist.
//!
//! Every insert is conflict-idempotent, so seeding an already-seeded store
//! changes nothing.

use sqlx::SqliteConnection;

use warden_auth::{CredentialHasher, PermissionLevel};
use warden_core::{ModuleId, RbacError, RbacResult, RoleId, UserId};

use crate::model::LegacyRole;
use crate::store::{insert_or_ignore, InsertRow, Store};

pub const ADMIN_NAME: &str = "Admin User";
pub const ADMIN_EMAIL: &str = "admin@example.com";

pub const ADMINISTRATOR: &str = "Administrator";
pub const MANAGER: &str = "Manager";
pub const EDITOR: &str = "Editor";
pub const VIEWER: &str = "Viewer";

pub const USERS_MODULE: &str = "Users";
pub const ROLES_MODULE: &str = "Roles";
pub const MODULES_MODULE: &str = "Modules";

pub const DEFAULT_ROLES: [&str; 4] = [ADMINISTRATOR, MANAGER, EDITOR, VIEWER];

pub const DEFAULT_MODULES: [(&str, &str); 3] = [
    (USERS_MODULE, "Manage Users"),
    (ROLES_MODULE, "Manage Roles"),
    (MODULES_MODULE, "Manage Modules"),
];

pub const DEFAULT_GRANTS: [(&str, &str, PermissionLevel); 5] = [
    (ADMINISTRATOR, USERS_MODULE, PermissionLevel::Write),
    (ADMINISTRATOR, ROLES_MODULE, PermissionLevel::Write),
    (ADMINISTRATOR, MODULES_MODULE, PermissionLevel::Write),
    (MANAGER, ROLES_MODULE, PermissionLevel::Read),
    (EDITOR, MODULES_MODULE, PermissionLevel::Read),
];

/// The administrator account created on first run.
#[derive(Clone)]
pub struct SeedData {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password_hash: String,
}

impl SeedData {
    pub fn new(admin_password_hash: impl Into<String>) -> Self {
        Self {
            admin_name: ADMIN_NAME.to_string(),
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password_hash: admin_password_hash.into(),
        }
    }

    /// Hash `admin_password` and build the default seed.
    pub fn with_password(hasher: &dyn CredentialHasher, admin_password: &str) -> RbacResult<Self> {
        Ok(Self::new(hasher.hash(admin_password)?))
    }
}

impl core::fmt::Debug for SeedData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedData")
            .field("admin_name", &self.admin_name)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

/// Result of the data half of seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Seed data committed; `inserted` counts rows that did not exist before.
    Applied { inserted: usize },
    /// Seed data failed and was rolled back. Startup continues.
    Skipped { error: RbacError },
}

/// Create the schema, then seed the defaults.
///
/// Only schema (and connection) failures are returned as errors.
pub async fn initialize(store: &Store, seed: &SeedData) -> RbacResult<SeedOutcome> {
    tracing::info!("creating tables");
    store.create_if_absent().await.inspect_err(|e| {
        tracing::error!(error = %e, "schema creation failed");
    })?;

    Ok(seed_defaults(store, seed).await)
}

/// Insert the default rows in one transaction. Never fails.
pub async fn seed_defaults(store: &Store, seed: &SeedData) -> SeedOutcome {
    tracing::info!("inserting initial data");
    match insert_defaults(store, seed).await {
        Ok(inserted) => {
            tracing::info!(inserted, "initial data ready");
            SeedOutcome::Applied { inserted }
        }
        Err(e) => {
            let error = match e {
                RbacError::SeedData(_) => e,
                other => RbacError::SeedData(other.to_string()),
            };
            tracing::warn!(error = %error, "initial data not inserted; continuing without defaults");
            SeedOutcome::Skipped { error }
        }
    }
}

async fn insert_defaults(store: &Store, seed: &SeedData) -> RbacResult<usize> {
    let mut tx = store.begin_write().await?;
    let mut inserted = 0usize;

    let admin_inserted = insert_or_ignore(
        &mut tx,
        InsertRow::User {
            name: &seed.admin_name,
            email: &seed.admin_email,
            password_hash: &seed.admin_password_hash,
            role: LegacyRole::Admin,
        },
    )
    .await?;
    inserted += admin_inserted as usize;
    let (admin_id, admin_tag) = user_by_email(&mut tx, &seed.admin_email).await?;

    for name in DEFAULT_ROLES {
        inserted += insert_or_ignore(&mut tx, InsertRow::Role { name, created_by: admin_id }).await? as usize;
    }

    for (name, description) in DEFAULT_MODULES {
        inserted += insert_or_ignore(
            &mut tx,
            InsertRow::Module {
                name,
                description: Some(description),
            },
        )
        .await? as usize;
    }

    for (role, module, permission) in DEFAULT_GRANTS {
        let role_id = role_id_by_name(&mut tx, role).await?;
        let module_id = module_id_by_name(&mut tx, module).await?;
        inserted += insert_or_ignore(
            &mut tx,
            InsertRow::RoleModule {
                role_id,
                module_id,
                permission,
            },
        )
        .await? as usize;
    }

    // An account that merely registered the admin email first is not the
    // seeded administrator and gets no role from the seed.
    if admin_inserted || admin_tag == LegacyRole::Admin.as_str() {
        let administrator = role_id_by_name(&mut tx, ADMINISTRATOR).await?;
        inserted += insert_or_ignore(
            &mut tx,
            InsertRow::UserRole {
                user_id: admin_id,
                role_id: administrator,
            },
        )
        .await? as usize;
    } else {
        tracing::warn!(email = %seed.admin_email, "admin email held by a non-admin account; Administrator not assigned");
    }

    tx.commit().await.map_err(|e| RbacError::SeedData(e.to_string()))?;
    Ok(inserted)
}

/// Id and legacy tag of the account holding `email`.
async fn user_by_email(conn: &mut SqliteConnection, email: &str) -> RbacResult<(UserId, String)> {
    sqlx::query_as::<_, (i64, String)>("SELECT id, role FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RbacError::SeedData(e.to_string()))?
        .map(|(id, role)| (UserId::new(id), role))
        .ok_or_else(|| RbacError::SeedData(format!("seed row '{email}' missing after insert")))
}

async fn role_id_by_name(conn: &mut SqliteConnection, name: &str) -> RbacResult<RoleId> {
    lookup_id(conn, "SELECT id FROM roles WHERE name = ?1", name).await.map(RoleId::new)
}

async fn module_id_by_name(conn: &mut SqliteConnection, name: &str) -> RbacResult<ModuleId> {
    lookup_id(conn, "SELECT id FROM modules WHERE name = ?1", name).await.map(ModuleId::new)
}

async fn lookup_id(conn: &mut SqliteConnection, sql: &'static str, key: &str) -> RbacResult<i64> {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RbacError::SeedData(e.to_string()))?
        .ok_or_else(|| RbacError::SeedData(format!("seed row '{key}' missing after insert")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use warden_auth::BcryptHasher;

    async fn snapshot(store: &Store) -> Vec<String> {
        let mut rows: Vec<String> = Vec::new();
        for sql in [
            "SELECT id || '|' || name || '|' || email || '|' || password || '|' || role FROM users ORDER BY id",
            "SELECT id || '|' || name || '|' || created_by FROM roles ORDER BY id",
            "SELECT id || '|' || name || '|' || coalesce(description, '') FROM modules ORDER BY id",
            "SELECT user_id || '|' || role_id FROM user_roles ORDER BY user_id, role_id",
            "SELECT role_id || '|' || module_id || '|' || permission FROM role_modules ORDER BY role_id, module_id",
        ] {
            let table: Vec<String> = sqlx::query_scalar(sql).fetch_all(store.pool()).await.unwrap();
            rows.extend(table);
            rows.push("--".to_string());
        }
        rows
    }

    #[tokio::test]
    async fn seeding_twice_equals_seeding_once() {
        let store = Store::in_memory().await.unwrap();
        let hasher = BcryptHasher::new(4);

        let first = initialize(&store, &SeedData::with_password(&hasher, "admin123").unwrap())
            .await
            .unwrap();
        let after_first = snapshot(&store).await;

        // A re-run hashes again (new salt); the existing admin row must win.
        let second = initialize(&store, &SeedData::with_password(&hasher, "admin123").unwrap())
            .await
            .unwrap();
        let after_second = snapshot(&store).await;

        // 1 user + 4 roles + 3 modules + 5 grants + 1 assignment
        assert_eq!(first, SeedOutcome::Applied { inserted: 14 });
        assert_eq!(second, SeedOutcome::Applied { inserted: 0 });
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn seeds_expected_defaults() {
        let store = Store::in_memory().await.unwrap();
        initialize(&store, &SeedData::new("hash")).await.unwrap();

        let roles: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY id")
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert_eq!(roles, DEFAULT_ROLES.to_vec());

        let grants: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT r.name, m.name, rm.permission
            FROM role_modules rm
            JOIN roles r ON r.id = rm.role_id
            JOIN modules m ON m.id = rm.module_id
            ORDER BY r.id, m.id
            "#,
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        let expected: Vec<(String, String, String)> = DEFAULT_GRANTS
            .iter()
            .map(|(r, m, p)| (r.to_string(), m.to_string(), p.as_str().to_string()))
            .collect();
        assert_eq!(grants, expected);

        let legacy: String = sqlx::query_scalar("SELECT role FROM users WHERE email = ?1")
            .bind(ADMIN_EMAIL)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(legacy, "admin");
    }

    #[tokio::test]
    async fn seed_data_failure_is_swallowed_and_rolled_back() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();

        // An over-long admin name violates the CHECK constraint.
        let mut seed = SeedData::new("hash");
        seed.admin_name = "x".repeat(101);

        let outcome = initialize(&store, &seed).await.unwrap();
        assert!(matches!(outcome, SeedOutcome::Skipped { error: RbacError::SeedData(_) }));

        let counts = store.table_counts().await.unwrap();
        assert!(counts.iter().all(|(_, n)| *n == 0), "partial seed left behind: {counts:?}");
    }

    #[tokio::test]
    async fn schema_failure_is_fatal() {
        let store = Store::in_memory().await.unwrap();
        store.close().await;

        let result = initialize(&store, &SeedData::new("hash")).await;
        assert!(matches!(result, Err(RbacError::Connection(_))));
    }

    #[tokio::test]
    async fn squatted_admin_email_gets_no_administrator_role() {
        let store = Store::in_memory().await.unwrap();
        store.create_if_absent().await.unwrap();
        sqlx::query("INSERT INTO users (name, email, password, role) VALUES ('Mallory', ?1, 'hash', 'user')")
            .bind(ADMIN_EMAIL)
            .execute(store.pool())
            .await
            .unwrap();

        let outcome = initialize(&store, &SeedData::new("hash")).await.unwrap();
        // 4 roles + 3 modules + 5 grants; neither the user nor the assignment.
        assert_eq!(outcome, SeedOutcome::Applied { inserted: 12 });

        let assignments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(assignments, 0);
        let name: String = sqlx::query_scalar("SELECT name FROM users WHERE email = ?1")
            .bind(ADMIN_EMAIL)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(name, "Mallory");
    }
}
