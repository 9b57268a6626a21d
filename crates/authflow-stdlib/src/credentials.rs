//! Password hashing with Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use authflow_core::CoreError;
use std::sync::OnceLock;

/// Hash a password into a PHC-formatted Argon2id string
pub fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::StepExecutionError(format!("password hashing failed: {}", e)))
}

/// Check a password against a stored hash.
///
/// A malformed hash is an error; a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CoreError> {
    let parsed = PasswordHash::new(encoded)
        .map_err(|e| CoreError::StepExecutionError(format!("stored credential is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Run a full verification against a throwaway hash and discard the result.
///
/// Used when there is no stored credential to check, so that rejecting an
/// unknown user costs the same as rejecting a wrong password. Always `false`.
pub fn verify_against_dummy(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("authflow-dummy-credential").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
    false
}
