//! JWT token issuing and verification
//!
//! Access tokens are HS256-signed and carry the user's identity plus the
//! company the session was scoped to when the token was issued. The guard
//! never trusts `activeCompanyId` from the token for authorization; it reloads
//! the user on every request.
//!
//! # Security
//!
//! - **Algorithm**: HS256 (HMAC with SHA-256)
//! - **Issuer**: always `"companyhub"`
//! - **Expiration**: configurable (`JWT_EXPIRES_IN`, default one day)
//! - **Secret**: at least 32 bytes, enforced by the API config
//!
//! Every verification failure surfaces as `JwtError::InvalidToken`; the
//! underlying reason is only logged at debug level.
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use companyhub_shared::auth::jwt::TokenService;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenService::new("a-secret-that-is-at-least-32-bytes!!", Duration::days(1));
//!
//! let claims = tokens.claims_for(Uuid::new_v4(), "ana@example.com", None);
//! let token = tokens.sign(&claims)?;
//!
//! assert_eq!(tokens.verify(&token)?, claims);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Issuer claim on every token
pub const ISSUER: &str = "companyhub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Signature, format, issuer or expiry check failed
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Failed to encode the token
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `nbf`, `exp`) plus the user's email
/// and active company at issue time. `activeCompanyId` serializes as `null`
/// when the user has no active company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    pub email: String,

    #[serde(rename = "activeCompanyId")]
    pub active_company_id: Option<Uuid>,

    /// Issuer - Always "companyhub"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims valid from now for `expires_in`
    ///
    /// An expiry past the representable range saturates instead of wrapping.
    pub fn new(
        user_id: Uuid,
        email: impl Into<String>,
        active_company_id: Option<Uuid>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.into(),
            active_company_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: now
                .checked_add_signed(expires_in)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs and verifies access tokens with one shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service for `secret` issuing tokens that live for `ttl`
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds claims for a user with this service's TTL
    pub fn claims_for(
        &self,
        user_id: Uuid,
        email: &str,
        active_company_id: Option<Uuid>,
    ) -> Claims {
        Claims::new(user_id, email, active_company_id, self.ttl)
    }

    /// Signs claims into a compact JWT
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Verifies a token and returns its claims
    ///
    /// Verifies:
    /// - Signature is valid
    /// - Token hasn't expired
    /// - Issuer is "companyhub"
    /// - Token is not used before nbf time
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidToken` for any failure
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(reason = ?e.kind(), "Token verification failed");
                JwtError::InvalidToken
            })
    }
}

/// Longest lifetime accepted for tokens and invites
pub const MAX_TTL_DAYS: i64 = 365;

/// Parses a token lifetime such as `"1d"`, `"12h"`, `"30m"` or `"45s"`
///
/// A bare number is taken as seconds. Returns None for anything else,
/// including zero or negative values and lifetimes over [`MAX_TTL_DAYS`].
pub fn parse_ttl(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let amount: i64 = number.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    let unit_seconds: i64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    let seconds = amount.checked_mul(unit_seconds)?;
    if seconds > MAX_TTL_DAYS * 24 * 60 * 60 {
        return None;
    }

    Some(Duration::seconds(seconds))
}
