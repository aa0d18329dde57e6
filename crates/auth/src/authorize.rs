use serde::Serialize;
use thiserror::Error;

use warden_core::{ModuleId, RbacError, UserId};

use crate::PermissionLevel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: user {user_id} needs '{required}' on module {module}")]
    Forbidden {
        user_id: UserId,
        module: String,
        required: PermissionLevel,
    },
}

impl From<AuthzError> for RbacError {
    fn from(value: AuthzError) -> Self {
        RbacError::Forbidden(value.to_string())
    }
}

/// The access-gate predicate.
///
/// `effective` is the resolved permission of a user on a module (`None` for no
/// access). No IO, no panics.
pub fn permits(effective: Option<PermissionLevel>, required: PermissionLevel) -> bool {
    effective >= Some(required)
}

/// Authorize a resolved permission, returning a typed denial.
pub fn authorize(
    user_id: UserId,
    module: impl Into<String>,
    effective: Option<PermissionLevel>,
    required: PermissionLevel,
) -> Result<(), AuthzError> {
    if permits(effective, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            user_id,
            module: module.into(),
            required,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Decision (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Explanation of an access-gate decision.
///
/// Answers "why was this request allowed/denied?" for a user, a module and a
/// required level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub required: PermissionLevel,
    /// `None` means the user holds no grant on the module.
    pub effective: Option<PermissionLevel>,
    pub granted: bool,
    pub reason: String,
}

impl AccessDecision {
    pub fn new(
        user_id: UserId,
        module_id: ModuleId,
        effective: Option<PermissionLevel>,
        required: PermissionLevel,
    ) -> Self {
        let granted = permits(effective, required);
        let reason = match (effective, granted) {
            (None, _) => format!(
                "user {user_id} holds no role granting access to module {module_id}"
            ),
            (Some(level), true) if level == required => {
                format!("effective permission '{level}' matches required '{required}'")
            }
            (Some(level), true) => {
                format!("effective permission '{level}' implies required '{required}'")
            }
            (Some(level), false) => format!(
                "effective permission '{level}' is below required '{required}'; grant '{required}' on module {module_id} to one of the user's roles"
            ),
        };

        Self {
            user_id,
            module_id,
            required,
            effective,
            granted,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn level() -> impl Strategy<Value = PermissionLevel> {
        prop_oneof![
            Just(PermissionLevel::Read),
            Just(PermissionLevel::Write),
            Just(PermissionLevel::Delete),
        ]
    }

    #[test]
    fn no_access_denies_everything() {
        for required in PermissionLevel::ALL {
            assert!(!permits(None, required));
        }
    }

    #[test]
    fn write_implies_read_but_not_delete() {
        let effective = Some(PermissionLevel::Write);
        assert!(permits(effective, PermissionLevel::Read));
        assert!(permits(effective, PermissionLevel::Write));
        assert!(!permits(effective, PermissionLevel::Delete));
    }

    #[test]
    fn authorize_reports_missing_level() {
        let err = authorize(UserId::new(2), "Roles", Some(PermissionLevel::Read), PermissionLevel::Write)
            .unwrap_err();
        assert_eq!(err.to_string(), "forbidden: user 2 needs 'write' on module Roles");
        assert!(matches!(RbacError::from(err), RbacError::Forbidden(_)));
    }

    #[test]
    fn decision_explains_denial() {
        let decision = AccessDecision::new(
            UserId::new(3),
            ModuleId::new(2),
            Some(PermissionLevel::Read),
            PermissionLevel::Write,
        );
        assert!(!decision.granted);
        assert!(decision.reason.contains("below required 'write'"));

        let decision = AccessDecision::new(UserId::new(3), ModuleId::new(2), None, PermissionLevel::Read);
        assert!(!decision.granted);
        assert!(decision.reason.contains("no role"));
    }

    proptest! {
        #[test]
        fn higher_levels_imply_read(effective in proptest::option::of(level())) {
            let write = permits(effective, PermissionLevel::Write);
            let delete = permits(effective, PermissionLevel::Delete);
            if write || delete {
                prop_assert!(permits(effective, PermissionLevel::Read));
            }
            if delete {
                prop_assert!(write);
            }
        }

        #[test]
        fn union_max_dominates_every_grant(grants in proptest::collection::vec(level(), 0..8), required in level()) {
            let effective = PermissionLevel::max_of(grants.iter().copied());
            let any_grant_suffices = grants.iter().any(|g| g.implies(required));
            prop_assert_eq!(permits(effective, required), any_grant_suffices);
        }
    }
}
