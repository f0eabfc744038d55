/// Configuration management for Blog Service
///
/// All settings come from environment variables; `main` loads a `.env` file
/// first when one exists.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DEV_SESSION_SECRET: &str = "yatube-dev-session-secret";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Persistence backend
    pub storage: StorageConfig,
    /// Index page cache
    pub cache: CacheConfig,
    /// Listing settings
    pub listing: ListingConfig,
    /// Session token settings
    pub session: SessionConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database URL
    pub database_url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Index page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis URL, only used by the redis backend
    pub redis_url: String,
    pub ttl_secs: u64,
    /// Drop cached index pages after every successful write
    pub invalidate_on_write: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub posts_per_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub cookie_name: String,
    pub login_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let posts_per_page: i64 = parse_env_or_default("POSTS_PER_PAGE", 10)?;
        if posts_per_page <= 0 {
            return Err("POSTS_PER_PAGE must be greater than zero".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("BLOG_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("BLOG_SERVICE_PORT", 8000)?,
            },
            storage: StorageConfig {
                backend: match std::env::var("STORAGE_BACKEND") {
                    Ok(value) => parse_storage_backend(&value)?,
                    Err(_) => StorageBackend::Postgres,
                },
                database_url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/yatube".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            cache: CacheConfig {
                backend: match std::env::var("PAGE_CACHE_BACKEND") {
                    Ok(value) => parse_cache_backend(&value)?,
                    Err(_) => CacheBackend::Memory,
                },
                redis_url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                ttl_secs: parse_env_or_default("PAGE_CACHE_TTL_SECS", 20)?,
                invalidate_on_write: parse_env_or_default("PAGE_CACHE_INVALIDATE_ON_WRITE", true)?,
            },
            listing: ListingConfig { posts_per_page },
            session: {
                let secret = match std::env::var("SESSION_SECRET") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("SESSION_SECRET must be set in production".to_string())
                    }
                    Err(_) => DEV_SESSION_SECRET.to_string(),
                };

                if production && (secret.trim().is_empty() || secret == DEV_SESSION_SECRET) {
                    return Err(
                        "SESSION_SECRET must be set to a non-default value in production"
                            .to_string(),
                    );
                }

                SessionConfig {
                    secret,
                    cookie_name: std::env::var("SESSION_COOKIE")
                        .unwrap_or_else(|_| "sessionid".to_string()),
                    login_url: std::env::var("LOGIN_URL")
                        .unwrap_or_else(|_| "/auth/login/".to_string()),
                }
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn parse_storage_backend(value: &str) -> Result<StorageBackend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
        "memory" => Ok(StorageBackend::Memory),
        other => Err(format!(
            "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
            other
        )),
    }
}

fn parse_cache_backend(value: &str) -> Result<CacheBackend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(CacheBackend::Memory),
        "redis" => Ok(CacheBackend::Redis),
        other => Err(format!(
            "PAGE_CACHE_BACKEND must be 'memory' or 'redis', got '{}'",
            other
        )),
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
