//! Access gate: the single authorization predicate for protected operations.
//!
//! `can(user, module, required)` holds iff the user's effective permission on
//! the module is at least `required` under `read < write < delete`.

use std::sync::Arc;

use warden_auth::{authorize, permits, AccessDecision, PermissionLevel};
use warden_core::{ModuleId, RbacResult, UserId};

use crate::resolver::PermissionResolver;

#[derive(Clone)]
pub struct AccessGate {
    resolver: Arc<dyn PermissionResolver>,
}

impl AccessGate {
    pub fn new(resolver: Arc<dyn PermissionResolver>) -> Self {
        Self { resolver }
    }

    /// Boolean form of the gate. Fails closed: a store error denies.
    pub async fn can(&self, user_id: UserId, module_id: ModuleId, required: PermissionLevel) -> bool {
        match self.resolver.resolve(user_id, module_id).await {
            Ok(effective) => permits(effective, required),
            Err(e) => {
                tracing::warn!(%user_id, %module_id, error = %e, "permission resolution failed; denying");
                false
            }
        }
    }

    /// Gate a protected operation. Denial is `RbacError::Forbidden`; store
    /// failures propagate unchanged so callers can tell them apart.
    pub async fn require(&self, user_id: UserId, module_id: ModuleId, required: PermissionLevel) -> RbacResult<()> {
        let effective = self.resolver.resolve(user_id, module_id).await?;
        authorize(user_id, module_id.to_string(), effective, required).inspect_err(|e| {
            tracing::info!(%user_id, %module_id, %required, "access denied: {e}");
        })?;
        Ok(())
    }

    /// [`require`](Self::require) for a module addressed by name.
    pub async fn require_named(&self, user_id: UserId, module_name: &str, required: PermissionLevel) -> RbacResult<()> {
        let effective = self.resolver.resolve_by_name(user_id, module_name).await?;
        authorize(user_id, module_name, effective, required).inspect_err(|e| {
            tracing::info!(%user_id, module = module_name, %required, "access denied: {e}");
        })?;
        Ok(())
    }

    /// Full decision record, for audit and debugging.
    pub async fn explain(&self, user_id: UserId, module_id: ModuleId, required: PermissionLevel) -> RbacResult<AccessDecision> {
        let effective = self.resolver.resolve(user_id, module_id).await?;
        Ok(AccessDecision::new(user_id, module_id, effective, required))
    }
}

impl core::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use warden_core::RbacError;

    use super::*;

    /// Fixed table of effective permissions.
    #[derive(Default)]
    struct StaticResolver {
        levels: HashMap<(i64, i64), PermissionLevel>,
        names: HashMap<String, i64>,
        fail: bool,
    }

    #[async_trait]
    impl PermissionResolver for StaticResolver {
        async fn resolve(&self, user_id: UserId, module_id: ModuleId) -> RbacResult<Option<PermissionLevel>> {
            if self.fail {
                return Err(RbacError::Connection("down".into()));
            }
            Ok(self.levels.get(&(user_id.get(), module_id.get())).copied())
        }

        async fn resolve_by_name(&self, user_id: UserId, module_name: &str) -> RbacResult<Option<PermissionLevel>> {
            match self.names.get(module_name) {
                Some(id) => self.resolve(user_id, ModuleId::new(*id)).await,
                None => Ok(None),
            }
        }
    }

    fn gate(levels: &[((i64, i64), PermissionLevel)]) -> AccessGate {
        let resolver = StaticResolver {
            levels: levels.iter().copied().collect(),
            names: HashMap::from([("Roles".to_string(), 2)]),
            fail: false,
        };
        AccessGate::new(Arc::new(resolver))
    }

    #[tokio::test]
    async fn can_follows_level_order() {
        let gate = gate(&[((2, 2), PermissionLevel::Read)]);
        let (user, roles) = (UserId::new(2), ModuleId::new(2));

        assert!(gate.can(user, roles, PermissionLevel::Read).await);
        assert!(!gate.can(user, roles, PermissionLevel::Write).await);
        assert!(!gate.can(user, roles, PermissionLevel::Delete).await);
        assert!(!gate.can(user, ModuleId::new(3), PermissionLevel::Read).await);
    }

    #[tokio::test]
    async fn require_returns_forbidden() {
        let gate = gate(&[((2, 2), PermissionLevel::Read)]);
        let err = gate
            .require(UserId::new(2), ModuleId::new(2), PermissionLevel::Write)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::Forbidden(_)));

        gate.require_named(UserId::new(2), "Roles", PermissionLevel::Read).await.unwrap();
        assert!(matches!(
            gate.require_named(UserId::new(2), "Users", PermissionLevel::Read).await,
            Err(RbacError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn store_failure_denies_but_is_not_forbidden() {
        let gate = AccessGate::new(Arc::new(StaticResolver {
            fail: true,
            ..Default::default()
        }));

        assert!(!gate.can(UserId::new(1), ModuleId::new(1), PermissionLevel::Read).await);
        assert!(matches!(
            gate.require(UserId::new(1), ModuleId::new(1), PermissionLevel::Read).await,
            Err(RbacError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn explain_reports_effective_level() {
        let gate = gate(&[((1, 1), PermissionLevel::Write)]);
        let decision = gate
            .explain(UserId::new(1), ModuleId::new(1), PermissionLevel::Read)
            .await
            .unwrap();
        assert!(decision.granted);
        assert_eq!(decision.effective, Some(PermissionLevel::Write));
    }
}
