use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use log::error;
use crate::server::controller::error::CustomError;

/// Salted argon2 hash in PHC string form.
pub(crate) fn hash_password(password: &str) -> Result<String, CustomError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("failed to hash password, {}", e);
            CustomError::DbError { message: "failed to hash password".to_string() }
        })
}

/// Constant-time check of `password` against a stored hash.
/// A malformed stored hash never matches.
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("stored password hash is malformed, {}", e);
            false
        }
    }
}
