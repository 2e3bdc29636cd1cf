use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Hash a password with Argon2id and a fresh random salt.
/// The returned PHC string carries both the salt and the hash.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Check `candidate` against a stored credential.
///
/// Legacy plaintext credentials are compared directly. Anything that parses
/// as a PHC string is only accepted by re-hashing the candidate with the
/// stored salt, so the hash string itself never works as a password.
pub fn verify_password(candidate: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => candidate == stored,
    }
}

/// Whether a stored credential is a PHC hash rather than legacy plaintext.
pub fn is_hashed(stored: &str) -> bool {
    PasswordHash::new(stored).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("pw1").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(is_hashed(&stored));

        assert!(verify_password("pw1", &stored));
        assert!(!verify_password("pw2", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("pw1").unwrap();
        let b = hash_password("pw1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("pw1", &a));
        assert!(verify_password("pw1", &b));
    }

    #[test]
    fn legacy_plaintext_is_accepted() {
        assert!(!is_hashed("abc"));
        assert!(verify_password("abc", "abc"));
        assert!(!verify_password("abd", "abc"));
    }

    #[test]
    fn stored_hash_is_not_a_password() {
        let stored = hash_password("pw1").unwrap();
        assert!(!verify_password(&stored, &stored));
    }

    #[test]
    fn unparseable_credential_is_treated_as_plaintext() {
        assert!(!is_hashed("plain$text"));
        assert!(!verify_password("pw", "plain$text"));
        assert!(verify_password("plain$text", "plain$text"));
    }
}
