/// Configuration management for the API server
///
/// This module loads configuration from environment variables (and a `.env`
/// file if present) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to (default: 8090)
/// - `APP_ENV`: `production` enables secure cookies and HSTS (default: development)
/// - `DATABASE_URL`: SQLite connection string (default: sqlite://data.db)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `SECRET_KEY`: Session signing secret, at least 32 characters in production
/// - `SESSION_LIFETIME_SECS`: Session lifetime (default: 86400)
/// - `UPLOAD_DIR`: Upload directory (default: uploads)
/// - `MAX_CONTENT_LENGTH`: Request body ceiling in bytes (default: 50 MB)
/// - `SWEEP_ORPHANS_ON_START`: Remove unreferenced uploads at boot (default: false)
/// - `BOOTSTRAP_ADMIN_NAME` / `_EMAIL` / `_PASSWORD`: Seeded super admin
/// - `RUST_LOG`, `LOG_FORMAT`: Read directly by `main`
///
/// # Example
///
/// ```no_run
/// use kutubxona_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Secret used when `SECRET_KEY` is unset outside production
const DEV_SECRET_KEY: &str = "kutubxona-development-secret-change-me";

/// Minimum length of `SECRET_KEY` in production
const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session configuration
    pub session: SessionConfig,

    /// Upload storage configuration
    pub uploads: UploadConfig,

    /// Account seeded on first start
    pub bootstrap: BootstrapConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Running in production (`APP_ENV=production`)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key for hashing session tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// How long a login lasts, in seconds
    pub lifetime_secs: i64,
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory holding uploaded files
    pub dir: PathBuf,

    /// Largest accepted request body, in bytes
    pub max_content_length: usize,

    /// Delete files no material references when the server starts
    pub sweep_orphans_on_start: bool,
}

/// Bootstrap super admin credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A numeric or boolean variable has an invalid value
    /// - `APP_ENV=production` and `SECRET_KEY` is missing or shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let production = var("APP_ENV", "development").eq_ignore_ascii_case("production");

        let secret = match lookup("SECRET_KEY") {
            Some(secret) => secret,
            None if production => {
                anyhow::bail!("SECRET_KEY environment variable is required in production")
            }
            None => {
                tracing::warn!("SECRET_KEY not set, using the insecure development default");
                DEV_SECRET_KEY.to_string()
            }
        };

        if production && secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("SECRET_KEY must be at least {} characters long", MIN_SECRET_LENGTH);
        }

        let lifetime_secs: i64 = parse_var(&lookup, "SESSION_LIFETIME_SECS", 86_400)?;
        if lifetime_secs <= 0 {
            anyhow::bail!("SESSION_LIFETIME_SECS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse_var(&lookup, "PORT", 8090)?,
                production,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL", "sqlite://data.db"),
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            },
            session: SessionConfig {
                secret,
                lifetime_secs,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(var("UPLOAD_DIR", "uploads")),
                max_content_length: parse_var(&lookup, "MAX_CONTENT_LENGTH", 50 * 1024 * 1024)?,
                sweep_orphans_on_start: parse_var(&lookup, "SWEEP_ORPHANS_ON_START", false)?,
            },
            bootstrap: BootstrapConfig {
                name: var("BOOTSTRAP_ADMIN_NAME", "Super Admin"),
                email: var("BOOTSTRAP_ADMIN_EMAIL", "admin@local"),
                password: var("BOOTSTRAP_ADMIN_PASSWORD", "admin123"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Parses an optional variable, falling back to `default` when unset
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}
