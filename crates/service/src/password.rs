//! Password hashing for `LOCAL` strategies.
//!
//! Hashes are argon2 PHC strings with a random salt. The variant used for new
//! hashes comes from `password.algorithm`; verification reads the variant
//! from the stored hash. Both run on the blocking thread pool.

use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use rand::rngs::OsRng;

use crate::errors::ServiceError;

/// Map a configured algorithm name to an argon2 variant.
pub fn algorithm(name: &str) -> Result<Algorithm, ServiceError> {
    match name {
        "argon2" | "argon2id" => Ok(Algorithm::Argon2id),
        "argon2i" => Ok(Algorithm::Argon2i),
        "argon2d" => Ok(Algorithm::Argon2d),
        other => Err(ServiceError::Hash(format!("unsupported password algorithm: {other}"))),
    }
}

/// Whether `token` parses as a PHC hash string.
pub fn is_password_hash(token: &str) -> bool { PasswordHash::new(token).is_ok() }

/// Hash a password with the named argon2 variant and a fresh salt.
pub async fn hash_password(password: &str, algorithm_name: &str) -> Result<String, ServiceError> {
    let algorithm = algorithm(algorithm_name)?;
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(algorithm, Version::V0x13, Params::default())
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| ServiceError::Hash(format!("task join error: {e}")))?
}

/// Check `password` against a stored PHC hash.
///
/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(&hash).map_err(|e| ServiceError::Hash(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| ServiceError::Hash(format!("task join error: {e}")))?
}
