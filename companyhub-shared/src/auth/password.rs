//! Password hashing using Argon2id
//!
//! # Security
//!
//! - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
//! - **Memory**: 64 MB (65536 KB)
//! - **Iterations**: 3 passes
//! - **Parallelism**: 4 lanes
//! - **Output**: 32-byte hash
//!
//! Hashes are stored as PHC strings, so the salt and parameters travel with
//! the hash and older hashes keep verifying if the parameters change.
//!
//! # Example
//!
//! ```
//! use companyhub_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("super_secret_password_123")?;
//!
//! assert!(verify_password("super_secret_password_123", &hash));
//! assert!(!verify_password("wrong_password", &hash));
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use lazy_static::lazy_static;
use tracing::warn;

lazy_static! {
    /// Hash checked when no account matches, so a miss costs a full verify
    static ref DUMMY_HASH: Option<String> = hash_password("companyhub-dummy-password").ok();
}

/// Error type for password hashing
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

/// Hashes a password using Argon2id with a fresh random salt
///
/// Example output:
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns false on mismatch and also when the stored hash cannot be parsed;
/// a corrupted hash must never grant access. The hash itself is not logged.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Stored password hash could not be parsed");
            return false;
        }
    };

    // Parameters are embedded in the hash
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => true,
        Err(argon2::password_hash::Error::Password) => false,
        Err(e) => {
            warn!(error = %e, "Password verification failed");
            false
        }
    }
}

/// Spends one verification on a throwaway hash and returns false
///
/// Login calls this when the email is unknown, so unknown-account and
/// wrong-password rejections take comparable time.
pub fn verify_dummy_password(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        verify_password(password, hash);
    }
    false
}
