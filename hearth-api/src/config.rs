/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: Connections kept open when idle (default: 1)
/// - `DATABASE_ACQUIRE_TIMEOUT`: Seconds to wait for a connection (default: 30)
/// - `DATABASE_IDLE_TIMEOUT`: Seconds before an idle connection closes, 0 for never (default: 600)
/// - `DATABASE_MAX_LIFETIME`: Seconds before a connection is recycled, 0 for never (default: 1800)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `JWT_TTL_HOURS`: Session token lifetime, at most one year (default: 720)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `RUST_LOG`, `LOG_FORMAT`: read by the logging setup in `main`
///
/// # Example
///
/// ```no_run
/// use hearth_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use hearth_shared::db::pool;
use serde::{Deserialize, Serialize};
use std::env;

/// Longest accepted session lifetime (one year)
pub const MAX_TTL_HOURS: i64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,

    /// None when disabled with 0
    pub idle_timeout_seconds: Option<u64>,
    pub max_lifetime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing key
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in hours
    pub ttl_hours: i64,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value doesn't
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("API_HOST", "0.0.0.0");
        let port: u16 = parse(&var("API_PORT", "8080"), "API_PORT")?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections: u32 =
            parse(&var("DATABASE_MAX_CONNECTIONS", "10"), "DATABASE_MAX_CONNECTIONS")?;
        let min_connections: u32 =
            parse(&var("DATABASE_MIN_CONNECTIONS", "1"), "DATABASE_MIN_CONNECTIONS")?;
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if min_connections > max_connections {
            anyhow::bail!("DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS");
        }
        let acquire_timeout_seconds: u64 =
            parse(&var("DATABASE_ACQUIRE_TIMEOUT", "30"), "DATABASE_ACQUIRE_TIMEOUT")?;
        let idle_timeout_seconds =
            optional_seconds(&var("DATABASE_IDLE_TIMEOUT", "600"), "DATABASE_IDLE_TIMEOUT")?;
        let max_lifetime_seconds =
            optional_seconds(&var("DATABASE_MAX_LIFETIME", "1800"), "DATABASE_MAX_LIFETIME")?;

        let secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let ttl_hours: i64 = parse(&var("JWT_TTL_HOURS", "720"), "JWT_TTL_HOURS")?;
        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            anyhow::bail!("JWT_TTL_HOURS must be between 1 and {}", MAX_TTL_HOURS);
        }

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = matches!(
            var("PRODUCTION", "false").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                acquire_timeout_seconds,
                idle_timeout_seconds,
                max_lifetime_seconds,
            },
            jwt: JwtConfig { secret, ttl_hours },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }

    /// Connection pool settings for `hearth_shared::db::pool::create_pool`
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            acquire_timeout_seconds: self.database.acquire_timeout_seconds,
            idle_timeout_seconds: self.database.idle_timeout_seconds,
            max_lifetime_seconds: self.database.max_lifetime_seconds,
        }
    }
}

fn parse<T>(value: &str, key: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e))
}

fn optional_seconds(value: &str, key: &str) -> anyhow::Result<Option<u64>> {
    let seconds: u64 = parse(value, key)?;
    Ok((seconds > 0).then_some(seconds))
}
