// apps/hospital_app/src/services/auth_service.rs

//! Password hashing and session-token minting.

use crate::errors::AppError;
use argon2::{
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand_core::{OsRng, RngCore};
use std::sync::LazyLock;
use tracing::{debug, error, instrument};

/// Minimum accepted password length for every account-creation and reset path.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a plain-text password with Argon2 and a fresh random salt.
///
/// Fails with `Validation` on an empty password.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    error!("Password hashing failed: Password cannot be empty.");
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// A mismatch is `Ok(false)`; a corrupt stored hash is an internal error.
#[instrument(
  name = "auth_service::verify_password",
  skip(stored_hash, provided_password),
  err(Display),
  fields(hash_len = stored_hash.len())
)]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other)))
    }
  }
}

static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash_password("no-such-account").ok());

/// Runs a full Argon2 verification against a throwaway hash so an unknown
/// username costs as much as a wrong password. Always `false` for real input.
pub fn verify_against_dummy(provided_password: &str) -> bool {
  match DUMMY_HASH.as_deref() {
    Some(hash) => verify_password(hash, provided_password).unwrap_or(false),
    None => false,
  }
}

/// Checks a new password pair the way every form in the service does.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
  if password != confirm {
    return Err(AppError::Validation(
      "New Password and Confirm Password is not same".to_string(),
    ));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

/// 256 random bits, URL-safe base64. Used as the opaque session cookie value.
pub fn new_session_token() -> String {
  let mut raw = [0u8; 32];
  OsRng.fill_bytes(&mut raw);
  URL_SAFE_NO_PAD.encode(raw)
}
