//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string (unless `STORE_BACKEND=memory`)
//!
//! ## Optional
//! - `STORE_BACKEND` - `postgres` (default) or `memory`
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `CLIENT_URL` - Allowed CORS origin (default: <http://localhost:5173>)
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `PAYMENT_CURRENCY` - ISO currency for payment intents (default: inr)
//! - `NATS_URL` - NATS server for domain events
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Connection string; contains the database password.
    pub database_url: Option<SecretString>,
    pub db_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub client_url: String,
    pub stripe: StripeConfig,
    pub nats_url: Option<String>,
}

/// Stripe credentials. `Debug` redacts the secrets.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub api_base: String,
    pub currency: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .finish()
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".to_string(),
            currency: "inr".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let invalid = |key: &str, e: &dyn std::fmt::Display| ConfigError::InvalidEnvVar(key.to_string(), e.to_string());

        let store_backend = match or_default("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(invalid("STORE_BACKEND", &format!("unknown backend '{other}'"))),
        };

        let database_url = get("DATABASE_URL").map(SecretString::from);
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let host = or_default("HOST", "0.0.0.0").parse::<IpAddr>().map_err(|e| invalid("HOST", &e))?;
        let port = or_default("PORT", "5000").parse::<u16>().map_err(|e| invalid("PORT", &e))?;
        let db_max_connections = or_default("DB_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| invalid("DB_MAX_CONNECTIONS", &e))?;

        let secret_key = get("STRIPE_SECRET_KEY");
        if let Some(key) = &secret_key {
            if !key.starts_with("sk_") && !key.starts_with("rk_") {
                return Err(invalid("STRIPE_SECRET_KEY", &"expected an sk_ or rk_ key"));
            }
        }

        let stripe = StripeConfig {
            secret_key: secret_key.map(SecretString::from),
            webhook_secret: get("STRIPE_WEBHOOK_SECRET").map(SecretString::from),
            api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com").trim_end_matches('/').to_string(),
            currency: or_default("PAYMENT_CURRENCY", "inr").to_lowercase(),
        };

        Ok(Self {
            store_backend,
            database_url,
            db_max_connections,
            host,
            port,
            client_url: or_default("CLIENT_URL", "http://localhost:5173"),
            stripe,
            nats_url: get("NATS_URL"),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// In-memory configuration for tests and local experiments.
    pub fn for_memory() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 10,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            client_url: "http://localhost:5173".to_string(),
            stripe: StripeConfig::default(),
            nats_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/shophub")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.port, 5000);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.client_url, "http://localhost:5173");
        assert_eq!(config.stripe.currency, "inr");
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.db_max_connections, 10);
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_database_url_required_for_postgres() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
        let config = load(&[("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory"), ("PORT", "not-a-port")]),
            Err(ConfigError::InvalidEnvVar(v, _)) if v == "PORT"
        ));
        assert!(matches!(
            load(&[("STORE_BACKEND", "memory"), ("STRIPE_SECRET_KEY", "pk_live_123")]),
            Err(ConfigError::InvalidEnvVar(v, _)) if v == "STRIPE_SECRET_KEY"
        ));
    }

    #[test]
    fn test_stripe_debug_redacts_secrets() {
        let config = load(&[
            ("STORE_BACKEND", "memory"),
            ("STRIPE_SECRET_KEY", "sk_test_abcdef"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123456"),
        ])
        .unwrap();
        let debug = format!("{:?}", config.stripe);
        assert!(!debug.contains("sk_test_abcdef"));
        assert!(!debug.contains("whsec_123456"));
        assert!(debug.contains("[REDACTED]"));
    }
}
