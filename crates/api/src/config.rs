//! Process configuration, read from the environment (and `.env` when present).

use anyhow::Context;

use warden_infra::StoreConfig;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_TTL_MINUTES: i64 = 60;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEV_ADMIN_PASSWORD: &str = "admin123";

#[derive(Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    /// Plaintext password of the seeded administrator.
    pub admin_password: String,
    /// `None` uses the bcrypt default cost.
    pub bcrypt_cost: Option<u32>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreConfig::from_env()?;

        let port = parse_var("PORT", DEFAULT_PORT)?;
        let ttl_minutes = parse_var("JWT_TTL_MINUTES", DEFAULT_JWT_TTL_MINUTES)?;
        anyhow::ensure!(ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_PASSWORD not set; seeding the administrator with the dev default");
            DEV_ADMIN_PASSWORD.to_string()
        });

        let bcrypt_cost = match std::env::var("BCRYPT_COST") {
            Ok(raw) => Some(
                raw.parse::<u32>()
                    .ok()
                    .filter(|cost| (4..=31).contains(cost))
                    .with_context(|| format!("BCRYPT_COST must be between 4 and 31, got '{raw}'"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            store,
            port,
            jwt_secret,
            jwt_ttl: chrono::Duration::minutes(ttl_minutes),
            admin_password,
            bcrypt_cost,
        })
    }

    /// In-memory store, fixed secret, cheapest hashing. Used by tests.
    pub fn for_tests() -> Self {
        Self {
            store: StoreConfig::in_memory(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl: chrono::Duration::minutes(DEFAULT_JWT_TTL_MINUTES),
            admin_password: DEV_ADMIN_PASSWORD.to_string(),
            bcrypt_cost: Some(4),
        }
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("store", &self.store)
            .field("port", &self.port)
            .field("jwt_ttl", &self.jwt_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_uses_default_when_unset() {
        let port: u16 = parse_var("WARDEN_TEST_SURELY_UNSET_PORT", 1234).unwrap();
        assert_eq!(port, 1234);
    }

    #[test]
    fn debug_hides_secrets() {
        let rendered = format!("{:?}", AppConfig::for_tests());
        assert!(!rendered.contains("test-secret"));
        assert!(!rendered.contains(DEV_ADMIN_PASSWORD));
    }
}
