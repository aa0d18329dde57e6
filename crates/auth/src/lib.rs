//! `warden-auth` — authorization and credential primitives.
//!
//! Decoupled from HTTP and storage: permission resolution happens in the store
//! layer and feeds the pure predicates here.

pub mod authorize;
pub mod claims;
pub mod credential;
pub mod permissions;

pub use authorize::{authorize, permits, AccessDecision, AuthzError};
pub use claims::{validate_claims, Hs256TokenService, JwtClaims, TokenValidationError};
pub use credential::{BcryptHasher, CredentialHasher};
pub use permissions::PermissionLevel;
