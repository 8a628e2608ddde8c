use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::InternalServerError("Hashing error".to_string()))
}

/// Checks a password against a stored hash. Accounts created before the
/// switch to argon2 still carry bcrypt hashes (`$2a$`, `$2b$`, `$2y$`).
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    if stored.starts_with("$2") {
        return bcrypt::verify(password, stored)
            .map_err(|_| AppError::InternalServerError("Invalid password hash".to_string()));
    }

    let parsed = PasswordHash::new(stored)
        .map_err(|_| AppError::InternalServerError("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
