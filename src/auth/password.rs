use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ApiError;

/// Hash a plain-text password with Argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a plain-text password against a stored Argon2 hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash or an argon2
/// failure is an error.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("Invalid stored password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("correct horse battery staple").expect("hashing failed");
        assert!(verify_password(&hash, "correct horse battery staple").expect("verify failed"));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hash = hash_password("p").expect("hashing failed");
        assert!(!verify_password(&hash, "q").expect("verify failed"));
    }

    #[test]
    fn hash_is_salted() {
        let first = hash_password("p").expect("hashing failed");
        let second = hash_password("p").expect("hashing failed");
        assert_ne!(first, second);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("hunter2").expect("hashing failed");
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("hunter2"));
    }

    #[test]
    fn garbage_stored_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "p").is_err());
    }
}
