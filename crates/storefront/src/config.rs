//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `THREADLINE_BACKEND_URL` - Base URL of the catalog/cart backend
//!
//! ## Optional
//! - `THREADLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `THREADLINE_PORT` - Listen port (default: 3000)
//! - `THREADLINE_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `THREADLINE_STOCK_REFRESH_SECS` - Background stock refresh period (default: 30)
//! - `THREADLINE_CATALOG_REFRESH_SECS` - Catalog reload period (default: 300)
//! - `THREADLINE_CACHE_TTL_SECS` - Product/filter list cache TTL (default: 300)
//! - `THREADLINE_SESSION_IDLE_SECS` - Idle time before a shopper session is torn down (default: 86400)
//! - `THREADLINE_CURRENCY` - Currency prefix for formatted amounts (default: "Rs. ")
//! - `THREADLINE_DELIVERY_FEE` - Flat delivery fee added to cart totals (default: 10)
//! - `THREADLINE_LOG_FORMAT` - `json` for structured log lines, anything else for text (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Remote backend configuration
    pub backend: BackendConfig,
    /// Cart and catalog behaviour
    pub shop: ShopConfig,
    /// Emit JSON log lines instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Remote backend (stock oracle, cart persistence, catalog) configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash.
    pub base_url: Url,
    /// TTL for cached product and filter lists.
    pub cache_ttl: Duration,
}

/// Cart and catalog behaviour.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Period of the background stock refresh while a cart is non-empty.
    pub stock_refresh_interval: Duration,
    /// Period of the catalog reload.
    pub catalog_refresh_interval: Duration,
    /// Idle time before a shopper session is torn down.
    pub session_idle_timeout: Duration,
    /// Prefix for formatted amounts.
    pub currency: String,
    /// Flat delivery fee added to non-empty carts.
    pub delivery_fee: Decimal,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            stock_refresh_interval: Duration::from_secs(30),
            catalog_refresh_interval: Duration::from_secs(300),
            session_idle_timeout: Duration::from_secs(24 * 60 * 60),
            currency: "Rs. ".to_string(),
            delivery_fee: Decimal::from(10),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("THREADLINE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("THREADLINE_PORT", "3000")?;
        let base_url = get_env_or_default("THREADLINE_BASE_URL", "http://localhost:3000");

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?,
            shop: ShopConfig::from_env()?,
            log_json: get_env_or_default("THREADLINE_LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("THREADLINE_BACKEND_URL")?;
        let base_url = parse_backend_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("THREADLINE_BACKEND_URL".to_string(), e))?;
        let cache_ttl = Duration::from_secs(parse_env_or_default("THREADLINE_CACHE_TTL_SECS", "300")?);
        Ok(Self {
            base_url,
            cache_ttl,
        })
    }
}

impl ShopConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let stock_secs: u64 = parse_env_or_default("THREADLINE_STOCK_REFRESH_SECS", "30")?;
        if stock_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "THREADLINE_STOCK_REFRESH_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let catalog_secs: u64 = parse_env_or_default("THREADLINE_CATALOG_REFRESH_SECS", "300")?;
        let idle_secs: u64 = parse_env_or_default("THREADLINE_SESSION_IDLE_SECS", "86400")?;

        Ok(Self {
            stock_refresh_interval: Duration::from_secs(stock_secs),
            catalog_refresh_interval: Duration::from_secs(catalog_secs.max(1)),
            session_idle_timeout: Duration::from_secs(idle_secs.max(1)),
            currency: get_env_or_default("THREADLINE_CURRENCY", "Rs. "),
            delivery_fee: parse_env_or_default("THREADLINE_DELIVERY_FEE", "10")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend URL.
///
/// Deploy scripts sometimes produce a value like `://api.internal:4000` when
/// the scheme variable is empty; that is read as plain `http`.
fn parse_backend_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with(':') {
        format!("http{trimmed}")
    } else {
        trimmed.to_string()
    };
    let url = Url::parse(&with_scheme).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
