//! One-way credential hashing.
//!
//! The rest of the workspace only sees `CredentialHasher`; bcrypt is the
//! production implementation.

use warden_core::RbacError;

/// Opaque one-way credential capability.
///
/// `hash` output is stored as-is in `users.password` and is never returned on
/// read paths.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, RbacError>;

    /// Returns `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, RbacError>;
}

/// Bcrypt-backed hasher.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, RbacError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| RbacError::store(format!("credential hashing failed: {e}")))
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, RbacError> {
        match bcrypt::verify(plaintext, stored_hash) {
            Ok(matched) => Ok(matched),
            Err(e) => {
                tracing::warn!("stored credential hash is unusable: {e}");
                Err(RbacError::store("stored credential hash is unusable"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("s3cret!").unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(hasher.verify("s3cret!", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn verifies_hashes_from_other_bcrypt_variants() {
        // `$2a$` prefix, as produced by most non-Rust bcrypt implementations.
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("password").unwrap().replacen("$2b$", "$2a$", 1);
        assert!(hasher.verify("password", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        let hasher = BcryptHasher::default();
        assert!(hasher.verify("x", "not-a-hash").is_err());
    }
}
