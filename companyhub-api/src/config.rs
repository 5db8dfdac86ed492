//! Configuration management for the API server
//!
//! Configuration is read once at startup from environment variables (and a
//! `.env` file in development).
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `PORT`: Port to bind to (default: 3000)
//! - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
//! - `JWT_EXPIRES_IN`: Token lifetime such as `1d`, `12h`, `30m`, at most 365 days (default: 1d)
//! - `FRONTEND_URL`: Browser origin allowed to send credentialed requests
//! - `COOKIE_SECURE`: Mark the auth cookie `Secure` (default: false)
//! - `INVITE_TTL_DAYS`: Default invite lifetime in days, 1 to 365 (default: 7)
//! - `PRODUCTION`: Enables HSTS (default: false)
//! - `RUST_LOG`: Log filter
//!
//! # Example
//!
//! ```no_run
//! use companyhub_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use chrono::Duration;
use companyhub_shared::auth::jwt::{parse_ttl, MAX_TTL_DAYS};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub invites: InviteConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origin; credentials are allowed for it
    pub frontend_url: Option<String>,

    /// Production mode (HSTS header)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Lifetime of issued tokens and of the auth cookie
    pub expires_in: Duration,
}

/// Auth cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Send the cookie only over HTTPS
    pub secure: bool,
}

/// Invite configuration
#[derive(Debug, Clone)]
pub struct InviteConfig {
    /// Lifetime of invites created without an explicit expiry
    pub ttl: Duration,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("API_HOST", "0.0.0.0");
        let port = var("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("PORT is not a valid port: {}", e))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expires_in_raw = var("JWT_EXPIRES_IN", "1d");
        let expires_in = parse_ttl(&expires_in_raw).ok_or_else(|| {
            anyhow::anyhow!(
                "JWT_EXPIRES_IN must look like 1d, 12h, 30m or 45s and be at most {} days, got {:?}",
                MAX_TTL_DAYS,
                expires_in_raw
            )
        })?;

        let invite_ttl_days = var("INVITE_TTL_DAYS", "7")
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("INVITE_TTL_DAYS is invalid: {}", e))?;
        if !(1..=MAX_TTL_DAYS).contains(&invite_ttl_days) {
            anyhow::bail!("INVITE_TTL_DAYS must be between 1 and {}", MAX_TTL_DAYS);
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                frontend_url: lookup("FRONTEND_URL").filter(|url| !url.trim().is_empty()),
                production: parse_bool(&var("PRODUCTION", "false")),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in,
            },
            cookie: CookieConfig {
                secure: parse_bool(&var("COOKIE_SECURE", "false")),
            },
            invites: InviteConfig {
                ttl: Duration::days(invite_ttl_days),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/hub"), ("JWT_SECRET", SECRET)])
            .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.expires_in, Duration::days(1));
        assert_eq!(config.invites.ttl, Duration::days(7));
        assert!(config.api.frontend_url.is_none());
        assert!(!config.cookie.secure);
        assert!(!config.api.production);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/hub"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("JWT_EXPIRES_IN", "12h"),
            ("FRONTEND_URL", "http://localhost:5173"),
            ("COOKIE_SECURE", "true"),
            ("INVITE_TTL_DAYS", "3"),
            ("PRODUCTION", "1"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.jwt.expires_in, Duration::hours(12));
        assert_eq!(config.api.frontend_url.as_deref(), Some("http://localhost:5173"));
        assert!(config.cookie.secure);
        assert_eq!(config.invites.ttl, Duration::days(3));
        assert!(config.api.production);
    }

    #[test]
    fn test_missing_required() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/hub")]).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = load(&[("DATABASE_URL", "postgresql://localhost/hub"), ("JWT_SECRET", "short")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_expiry_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgresql://localhost/hub"),
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRES_IN", "forever"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_ttls_rejected() {
        for expires_in in ["366d", "200000000d", "99999999999999d"] {
            let result = load(&[
                ("DATABASE_URL", "postgresql://localhost/hub"),
                ("JWT_SECRET", SECRET),
                ("JWT_EXPIRES_IN", expires_in),
            ]);
            assert!(result.is_err(), "{}", expires_in);
        }

        for days in ["0", "366", "99999999999999"] {
            let result = load(&[
                ("DATABASE_URL", "postgresql://localhost/hub"),
                ("JWT_SECRET", SECRET),
                ("INVITE_TTL_DAYS", days),
            ]);
            assert!(result.is_err(), "{}", days);
        }
    }

    #[test]
    fn test_longest_invite_ttl_accepted() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/hub"),
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRES_IN", "365d"),
            ("INVITE_TTL_DAYS", "365"),
        ])
        .unwrap();

        assert_eq!(config.jwt.expires_in, Duration::days(365));
        assert_eq!(config.invites.ttl, Duration::days(365));
    }
}
