use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default bcrypt cost factor for password hashing.
///
/// Cost 12 is ~250ms per hash on current hardware.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum bcrypt cost accepted from configuration.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum bcrypt cost accepted from configuration.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default access-token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Default refresh-token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Default tolerated future `iat` in seconds.
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: u64 = common::jwt::DEFAULT_CLOCK_SKEW.as_secs();

/// Default database pool size.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Carries the database password, so `Debug` redacts it.
    pub database_url: SecretString,
    pub bind_address: String,
    pub database_max_connections: u32,
    pub jwt_issuer: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub jwt_clock_skew: Duration,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Key file not found: {0}")]
    KeyNotFound(String),

    #[error("Malformed key material: {0}")]
    MalformedKey(String),

    #[error("Public key does not match private key")]
    KeyMismatch,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8083".to_string());

        let jwt_issuer = required(vars, "JWT_ISSUER")?;
        if jwt_issuer.trim().is_empty() {
            return Err(invalid("JWT_ISSUER", "must not be empty"));
        }

        let access_minutes: i64 = parse_or(
            vars,
            "JWT_ACCESS_TOKEN_TTL_MINUTES",
            DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
        )?;
        if access_minutes <= 0 {
            return Err(invalid(
                "JWT_ACCESS_TOKEN_TTL_MINUTES",
                "must be greater than zero",
            ));
        }

        let refresh_days: i64 = parse_or(
            vars,
            "JWT_REFRESH_TOKEN_TTL_DAYS",
            DEFAULT_REFRESH_TOKEN_TTL_DAYS,
        )?;
        if refresh_days <= 0 {
            return Err(invalid(
                "JWT_REFRESH_TOKEN_TTL_DAYS",
                "must be greater than zero",
            ));
        }

        // Bounds keep the chrono constructors below from overflowing
        let access_token_ttl = chrono::Duration::try_minutes(access_minutes)
            .ok_or_else(|| invalid("JWT_ACCESS_TOKEN_TTL_MINUTES", "out of range"))?;
        let refresh_token_ttl = chrono::Duration::try_days(refresh_days)
            .ok_or_else(|| invalid("JWT_REFRESH_TOKEN_TTL_DAYS", "out of range"))?;

        let private_key_path = PathBuf::from(required(vars, "JWT_PRIVATE_KEY_PATH")?);
        let public_key_path = PathBuf::from(required(vars, "JWT_PUBLIC_KEY_PATH")?);

        let skew_secs: u64 = parse_or(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        )?;
        let max_skew = common::jwt::MAX_CLOCK_SKEW.as_secs();
        if skew_secs == 0 || skew_secs > max_skew {
            return Err(invalid(
                "JWT_CLOCK_SKEW_SECONDS",
                &format!("must be between 1 and {max_skew}"),
            ));
        }

        let bcrypt_cost: u32 = parse_or(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(invalid(
                "BCRYPT_COST",
                &format!("must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"),
            ));
        }

        let database_max_connections: u32 = parse_or(
            vars,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;
        if database_max_connections == 0 {
            return Err(invalid(
                "DATABASE_MAX_CONNECTIONS",
                "must be greater than zero",
            ));
        }

        Ok(Config {
            database_url: SecretString::from(database_url),
            bind_address,
            database_max_connections,
            jwt_issuer,
            access_token_ttl,
            refresh_token_ttl,
            private_key_path,
            public_key_path,
            jwt_clock_skew: Duration::from_secs(skew_secs),
            bcrypt_cost,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_or<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(name, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
