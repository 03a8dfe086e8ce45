use std::path::PathBuf;
use std::str::FromStr;

use aurim_core::credentials::{
    Argon2Config, CredentialService, DEFAULT_MEMORY_COST_KIB, DEFAULT_PARALLELISM,
    DEFAULT_TIME_COST,
};
use aurim_core::token::TokenConfig;
use axum::http::HeaderValue;

/// Default upload cap for avatar bodies (5 MiB).
pub const DEFAULT_MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {message}")]
    Invalid {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// Everything except `TOKEN_SECRET` has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory holding one avatar file per account.
    pub avatar_dir: PathBuf,
    /// Prefix for avatar URLs handed back to clients.
    pub public_base_url: String,
    /// Largest accepted avatar upload body, in bytes.
    pub max_avatar_bytes: usize,
    /// Token signing secret and lifetime.
    pub token: TokenConfig,
    /// Password hashing cost.
    pub argon2: Argon2Config,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8080`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `TOKEN_SECRET`         | required, 32+ bytes        |
    /// | `AVATAR_DIR`           | `./data/avatars`           |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:8080`    |
    /// | `MAX_AVATAR_BYTES`     | `5242880`                  |
    /// | `ARGON2_TIME_COST`     | `3`                        |
    /// | `ARGON2_MEMORY_KIB`    | `10240`                    |
    /// | `ARGON2_PARALLELISM`   | `4`                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse("PORT", var("PORT", "8080"))?;
        let cors_origins = parse_origins(&var("CORS_ORIGINS", "http://localhost:5173"))?;
        let request_timeout_secs = parse("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS", "30"))?;
        let avatar_dir = PathBuf::from(var("AVATAR_DIR", "./data/avatars"));
        let public_base_url = var("PUBLIC_BASE_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();
        let max_avatar_bytes = parse(
            "MAX_AVATAR_BYTES",
            var("MAX_AVATAR_BYTES", &DEFAULT_MAX_AVATAR_BYTES.to_string()),
        )?;

        let secret = lookup("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?;
        let token = TokenConfig::new(secret).map_err(|e| ConfigError::Invalid {
            name: "TOKEN_SECRET",
            value: "<redacted>".into(),
            message: e.to_string(),
        })?;

        let argon2 = Argon2Config {
            time_cost: parse(
                "ARGON2_TIME_COST",
                var("ARGON2_TIME_COST", &DEFAULT_TIME_COST.to_string()),
            )?,
            memory_cost_kib: parse(
                "ARGON2_MEMORY_KIB",
                var("ARGON2_MEMORY_KIB", &DEFAULT_MEMORY_COST_KIB.to_string()),
            )?,
            parallelism: parse(
                "ARGON2_PARALLELISM",
                var("ARGON2_PARALLELISM", &DEFAULT_PARALLELISM.to_string()),
            )?,
        };
        CredentialService::new(argon2).map_err(|e| ConfigError::Invalid {
            name: "ARGON2_*",
            value: format!(
                "t={} m={} p={}",
                argon2.time_cost, argon2.memory_cost_kib, argon2.parallelism
            ),
            message: e.to_string(),
        })?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            avatar_dir,
            public_base_url,
            max_avatar_bytes,
            token,
            argon2,
        })
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            name,
            message: e.to_string(),
            value,
        }),
    }
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            // Credentialed CORS cannot use a wildcard origin.
            if origin == "*" {
                return Err(ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    value: origin.to_string(),
                    message: "wildcard origin is not allowed with credentials".into(),
                });
            }
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                name: "CORS_ORIGINS",
                value: origin.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}
