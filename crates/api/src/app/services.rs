//! Service wiring: one store handle shared by every manager, the resolver and
//! the gate.

use std::sync::Arc;

use warden_auth::{BcryptHasher, CredentialHasher, Hs256TokenService};
use warden_core::{RbacError, RbacResult};
use warden_infra::seed::{self, SeedData, SeedOutcome};
use warden_infra::{
    AccessGate, ModuleManager, RoleManager, RoleModuleManager, SqlPermissionResolver, Store, UserManager,
    UserRoleManager,
};

use crate::config::AppConfig;

/// Shared application services, injected into handlers as an extension.
#[derive(Clone)]
pub struct AppServices {
    pub store: Store,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<Hs256TokenService>,
    pub users: UserManager,
    pub roles: RoleManager,
    pub modules: ModuleManager,
    pub grants: RoleModuleManager,
    pub assignments: UserRoleManager,
    pub resolver: SqlPermissionResolver,
    pub gate: AccessGate,
}

impl AppServices {
    pub fn new(store: Store, config: &AppConfig) -> Self {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(
            config
                .bcrypt_cost
                .map(BcryptHasher::new)
                .unwrap_or_default(),
        );
        let tokens = Arc::new(Hs256TokenService::new(config.jwt_secret.as_bytes(), config.jwt_ttl));
        let resolver = SqlPermissionResolver::new(store.clone());

        Self {
            users: UserManager::new(store.clone(), hasher.clone()),
            roles: RoleManager::new(store.clone()),
            modules: ModuleManager::new(store.clone()),
            grants: RoleModuleManager::new(store.clone()),
            assignments: UserRoleManager::new(store.clone()),
            gate: AccessGate::new(Arc::new(resolver.clone())),
            resolver,
            hasher,
            tokens,
            store,
        }
    }

    /// Create the schema and seed the defaults.
    ///
    /// The admin password is hashed off the async workers.
    pub async fn initialize(&self, admin_password: &str) -> RbacResult<SeedOutcome> {
        let hasher = self.hasher.clone();
        let password = admin_password.to_string();
        let seed = tokio::task::spawn_blocking(move || SeedData::with_password(hasher.as_ref(), &password))
            .await
            .map_err(|e| RbacError::store(format!("admin credential hashing aborted: {e}")))??;

        seed::initialize(&self.store, &seed).await
    }
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
