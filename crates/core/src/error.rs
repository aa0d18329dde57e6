//! RBAC error model.

use thiserror::Error;

/// Result type used across the RBAC layers.
pub type RbacResult<T> = Result<T, RbacError>;

/// Typed failure of an RBAC operation.
///
/// Store-level failures are translated into these variants by the store layer;
/// raw driver errors never cross this boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// The store could not be reached.
    #[error("database unavailable: {0}")]
    Connection(String),

    /// Table creation failed. Fatal to the startup sequence.
    #[error("schema creation failed: {0}")]
    Schema(String),

    /// Inserting the default data failed. Logged and swallowed by the seeder.
    #[error("seed data insertion failed: {0}")]
    SeedData(String),

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target or a referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The access gate denied the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Input failed validation (e.g. empty name, malformed email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Credentials or token were rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl RbacError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Short machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "database_unavailable",
            Self::Schema(_) => "schema_error",
            Self::SeedData(_) => "seed_data_error",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Store(_) => "store_error",
        }
    }
}
