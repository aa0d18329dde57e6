use core::str::FromStr;

use serde::{Deserialize, Serialize};

use warden_core::RbacError;

/// Permission level a role holds over a module.
///
/// Levels are totally ordered: `Read < Write < Delete`. A higher level implies
/// every lower one. "No access" is modeled as `Option::None`, which `Option`'s
/// ordering already places below `Some(Read)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    Delete,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 3] = [Self::Read, Self::Write, Self::Delete];

    /// Column value used in the `role_modules.permission` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    /// Whether this level satisfies `required`.
    pub fn implies(self, required: PermissionLevel) -> bool {
        self >= required
    }

    /// Union of grants: the highest level, or `None` when there is no grant.
    pub fn max_of<I>(levels: I) -> Option<PermissionLevel>
    where
        I: IntoIterator<Item = PermissionLevel>,
    {
        levels.into_iter().max()
    }
}

impl core::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            other => Err(RbacError::validation(format!(
                "permission must be one of: read, write, delete (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_read_write_delete() {
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Delete);
        assert!(None < Some(PermissionLevel::Read));
    }

    #[test]
    fn max_of_empty_is_none() {
        assert_eq!(PermissionLevel::max_of([]), None);
        assert_eq!(
            PermissionLevel::max_of([PermissionLevel::Read, PermissionLevel::Delete, PermissionLevel::Write]),
            Some(PermissionLevel::Delete)
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("WRITE".parse::<PermissionLevel>().unwrap(), PermissionLevel::Write);
        assert!("admin".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn serde_uses_column_values() {
        for level in PermissionLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
    }
}
