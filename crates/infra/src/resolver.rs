//! Effective-permission resolution.
//!
//! The effective permission of a user on a module is the maximum level over
//! every grant reachable through the user's role memberships. It is computed
//! from the store on every call: there is no cache to go stale when a role is
//! deleted or a grant downgraded.

use std::collections::BTreeMap;

use async_trait::async_trait;

use warden_auth::PermissionLevel;
use warden_core::{ModuleId, RbacResult, UserId};

use crate::model::ModulePermission;
use crate::store::rows::parse_level;
use crate::store::{map_sqlx_error, Store};

/// Source of effective permissions for the access gate.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// `None` means no access: the user holds no role, or none of their roles
    /// has a grant on the module.
    async fn resolve(&self, user_id: UserId, module_id: ModuleId) -> RbacResult<Option<PermissionLevel>>;

    /// Same as [`resolve`](Self::resolve), addressing the module by its unique name.
    async fn resolve_by_name(&self, user_id: UserId, module_name: &str) -> RbacResult<Option<PermissionLevel>>;
}

/// Resolver backed by the relational store.
#[derive(Debug, Clone)]
pub struct SqlPermissionResolver {
    store: Store,
}

impl SqlPermissionResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Effective permission per module for one user, ordered by module id.
    pub async fn effective_permissions(&self, user_id: UserId) -> RbacResult<Vec<ModulePermission>> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            r#"
            SELECT m.id, m.name, rm.permission
            FROM user_roles ur
            JOIN role_modules rm ON rm.role_id = ur.role_id
            JOIN modules m ON m.id = rm.module_id
            WHERE ur.user_id = ?1
            "#,
        )
        .bind(user_id.get())
        .fetch_all(self.store.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut by_module: BTreeMap<i64, ModulePermission> = BTreeMap::new();
        for (module_id, module_name, raw) in rows {
            let level = parse_level(&raw)?;
            by_module
                .entry(module_id)
                .and_modify(|existing| existing.permission = existing.permission.max(level))
                .or_insert(ModulePermission {
                    module_id: ModuleId::new(module_id),
                    module_name,
                    permission: level,
                });
        }

        Ok(by_module.into_values().collect())
    }
}

fn max_level(raw_levels: &[String]) -> RbacResult<Option<PermissionLevel>> {
    let levels = raw_levels
        .iter()
        .map(|raw| parse_level(raw))
        .collect::<RbacResult<Vec<_>>>()?;
    // Compare as levels, never as strings: "delete" < "read" lexically.
    Ok(PermissionLevel::max_of(levels))
}

#[async_trait]
impl PermissionResolver for SqlPermissionResolver {
    async fn resolve(&self, user_id: UserId, module_id: ModuleId) -> RbacResult<Option<PermissionLevel>> {
        let raw: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT rm.permission
            FROM user_roles ur
            JOIN role_modules rm ON rm.role_id = ur.role_id
            WHERE ur.user_id = ?1 AND rm.module_id = ?2
            "#,
        )
        .bind(user_id.get())
        .bind(module_id.get())
        .fetch_all(self.store.pool())
        .await
        .map_err(map_sqlx_error)?;

        let level = max_level(&raw)?;
        tracing::debug!(%user_id, %module_id, ?level, "resolved permission");
        Ok(level)
    }

    async fn resolve_by_name(&self, user_id: UserId, module_name: &str) -> RbacResult<Option<PermissionLevel>> {
        let raw: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT rm.permission
            FROM user_roles ur
            JOIN role_modules rm ON rm.role_id = ur.role_id
            JOIN modules m ON m.id = rm.module_id
            WHERE ur.user_id = ?1 AND m.name = ?2
            "#,
        )
        .bind(user_id.get())
        .bind(module_name)
        .fetch_all(self.store.pool())
        .await
        .map_err(map_sqlx_error)?;

        let level = max_level(&raw)?;
        tracing::debug!(%user_id, module = module_name, ?level, "resolved permission");
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::seed::{self, SeedData};

    async fn seeded() -> (Store, SqlPermissionResolver) {
        let store = Store::in_memory().await.unwrap();
        seed::initialize(&store, &SeedData::new("hash")).await.unwrap();
        (store.clone(), SqlPermissionResolver::new(store))
    }

    async fn exec(store: &Store, sql: &str) {
        sqlx::query(sql).execute(store.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn seeded_admin_writes_users() {
        let (_store, resolver) = seeded().await;
        let level = resolver.resolve_by_name(UserId::new(1), seed::USERS_MODULE).await.unwrap();
        assert_eq!(level, Some(PermissionLevel::Write));
        assert_eq!(
            resolver.resolve(UserId::new(1), ModuleId::new(1)).await.unwrap(),
            Some(PermissionLevel::Write)
        );
    }

    #[tokio::test]
    async fn user_without_roles_has_no_access() {
        let (store, resolver) = seeded().await;
        exec(&store, "INSERT INTO users (name, email, password) VALUES ('Nobody', 'nobody@x.io', 'h')").await;

        for module in 1..=3 {
            assert_eq!(resolver.resolve(UserId::new(2), ModuleId::new(module)).await.unwrap(), None);
        }
        assert!(resolver.effective_permissions(UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_and_module_have_no_access() {
        let (_store, resolver) = seeded().await;
        assert_eq!(resolver.resolve(UserId::new(404), ModuleId::new(1)).await.unwrap(), None);
        assert_eq!(resolver.resolve(UserId::new(1), ModuleId::new(404)).await.unwrap(), None);
        assert_eq!(resolver.resolve_by_name(UserId::new(1), "Reports").await.unwrap(), None);
    }

    #[tokio::test]
    async fn union_takes_the_highest_level_across_roles() {
        let (store, resolver) = seeded().await;
        exec(&store, "INSERT INTO users (name, email, password) VALUES ('Multi', 'multi@x.io', 'h')").await;
        // Manager (2): read on Roles. Viewer (4): delete on Roles.
        exec(&store, "INSERT INTO role_modules (role_id, module_id, permission) VALUES (4, 2, 'delete')").await;
        exec(&store, "INSERT INTO user_roles (user_id, role_id) VALUES (2, 2), (2, 4)").await;

        assert_eq!(
            resolver.resolve(UserId::new(2), ModuleId::new(2)).await.unwrap(),
            Some(PermissionLevel::Delete)
        );

        // Dropping the stronger role falls back to the remaining grant.
        exec(&store, "DELETE FROM roles WHERE id = 4").await;
        assert_eq!(
            resolver.resolve(UserId::new(2), ModuleId::new(2)).await.unwrap(),
            Some(PermissionLevel::Read)
        );
    }

    #[tokio::test]
    async fn downgrade_is_visible_immediately() {
        let (store, resolver) = seeded().await;
        assert_eq!(
            resolver.resolve(UserId::new(1), ModuleId::new(3)).await.unwrap(),
            Some(PermissionLevel::Write)
        );

        exec(&store, "UPDATE role_modules SET permission = 'read' WHERE role_id = 1 AND module_id = 3").await;
        assert_eq!(
            resolver.resolve(UserId::new(1), ModuleId::new(3)).await.unwrap(),
            Some(PermissionLevel::Read)
        );
    }

    #[tokio::test]
    async fn effective_permissions_lists_each_module_once() {
        let (store, resolver) = seeded().await;
        exec(&store, "INSERT INTO user_roles (user_id, role_id) VALUES (1, 2), (1, 3)").await;

        let perms = resolver.effective_permissions(UserId::new(1)).await.unwrap();
        let summary: Vec<(&str, PermissionLevel)> =
            perms.iter().map(|p| (p.module_name.as_str(), p.permission)).collect();
        assert_eq!(
            summary,
            vec![
                ("Users", PermissionLevel::Write),
                ("Roles", PermissionLevel::Write),
                ("Modules", PermissionLevel::Write),
            ]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn level() -> impl Strategy<Value = Option<PermissionLevel>> {
            prop_oneof![
                Just(None),
                Just(Some(PermissionLevel::Read)),
                Just(Some(PermissionLevel::Write)),
                Just(Some(PermissionLevel::Delete)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 32,
                ..ProptestConfig::default()
            })]

            /// Property: the effective level is the maximum over the grants of
            /// the roles the user holds, and `None` without any.
            #[test]
            fn resolve_is_max_over_held_roles(
                grants in prop::collection::vec(level(), 4),
                held in prop::collection::vec(any::<bool>(), 4),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
                let (resolved, expected) = runtime.block_on(async {
                    let (store, resolver) = seeded().await;
                    exec(&store, "INSERT INTO users (name, email, password) VALUES ('P', 'p@x.io', 'h')").await;
                    exec(&store, "INSERT INTO modules (name) VALUES ('Reports')").await;

                    let mut expected = None;
                    for (role_id, (grant, holds)) in (1..=4).zip(grants.iter().zip(&held)) {
                        if let Some(level) = grant {
                            exec(&store, &format!(
                                "INSERT INTO role_modules (role_id, module_id, permission) VALUES ({role_id}, 4, '{level}')"
                            )).await;
                        }
                        if *holds {
                            exec(&store, &format!("INSERT INTO user_roles (user_id, role_id) VALUES (2, {role_id})")).await;
                            expected = expected.max(*grant);
                        }
                    }

                    (resolver.resolve(UserId::new(2), ModuleId::new(4)).await.unwrap(), expected)
                });
                prop_assert_eq!(resolved, expected);
            }
        }
    }
}
