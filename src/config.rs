// todo_api/src/config.rs
use std::env;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read once at startup and handed to whatever needs them.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub api_version: String,
    pub port: u16,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub db_pool_size: u32,
}

// Keeps secrets out of startup logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("port", &self.port)
            .field("token_ttl_days", &self.token_ttl.num_days())
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("db_pool_size", &self.db_pool_size)
            .finish()
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup, which keeps tests off the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        let api_version = lookup("API_VERSION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "1".to_string());
        let port = parsed(&lookup, "API_PORT", 8080u16)?;
        let ttl_days = parsed(&lookup, "TOKEN_TTL_DAYS", 7i64)?;
        if ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_DAYS",
                value: ttl_days.to_string(),
            });
        }
        let bcrypt_cost = parsed(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        let db_pool_size = parsed(&lookup, "DB_POOL_SIZE", 10u32)?;

        Ok(AppConfig {
            database_url,
            jwt_secret,
            api_version,
            port,
            token_ttl: Duration::days(ttl_days),
            bcrypt_cost,
            db_pool_size,
        })
    }
}

/// Path prefix shared by every versioned route, e.g. `/api/v1`.
pub fn api_base(version: &str) -> String {
    format!("/api/v{}", version)
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}
