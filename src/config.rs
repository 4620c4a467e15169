use std::env;
use std::str::FromStr;

use derive_more::Display;

#[derive(Debug, Display, PartialEq)]
pub enum ConfigError {
    #[display(fmt = "{} env var is required", _0)]
    Missing(String),
    #[display(fmt = "{} has an invalid value: {}", _0, _1)]
    Invalid(String, String),
}

impl std::error::Error for ConfigError {}

/// Identity provider settings; only read when `AUTH_ENABLED` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub jwks_url: String,
    pub issuer: String,
    pub audience: Option<String>,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

/// Service configuration, loaded from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Absent means the in-process store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Base of invitation links and checkout redirect URLs.
    pub frontend_url: String,
    /// `None` runs with the development identity.
    pub auth: Option<AuthConfig>,
    pub stripe: StripeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 5,
            host: "127.0.0.1".to_string(),
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            auth: None,
            stripe: StripeConfig {
                api_base: "https://api.stripe.com".to_string(),
                ..StripeConfig::default()
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads every setting through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let auth = if parse_or(&var, "AUTH_ENABLED", false)? {
            let required = |name: &str| var(name).ok_or_else(|| ConfigError::Missing(name.to_string()));
            Some(AuthConfig {
                jwks_url: required("AUTH_JWKS_URL")?,
                issuer: required("AUTH_ISSUER")?,
                audience: var("AUTH_AUDIENCE"),
                cache_ttl_secs: parse_or(&var, "JWKS_CACHE_TTL_SECS", 3600)?,
            })
        } else {
            None
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(&var, "PORT", defaults.port)?,
            frontend_url: var("FRONTEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.frontend_url),
            auth,
            stripe: StripeConfig {
                secret_key: var("STRIPE_SECRET_KEY").unwrap_or_default(),
                webhook_secret: var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
                api_base: var("STRIPE_API_BASE")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.stripe.api_base),
            },
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .to_lowercase()
            .parse()
            .map_err(|_| ConfigError::Invalid(name.to_string(), raw)),
    }
}
