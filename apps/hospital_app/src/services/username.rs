// apps/hospital_app/src/services/username.rs

//! Username rules shared by every account-creation path.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::errors::AppError;

static USERNAME_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{4,29}$").expect("username pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error(
    "Invalid username. It must start with a letter and contain only letters, numbers, and underscores. Length between 5-30 characters."
  )]
  InvalidPattern,
  #[error("Username already exists. Please choose a different one.")]
  Taken,
}

impl From<ValidationError> for AppError {
  fn from(err: ValidationError) -> Self {
    AppError::Validation(err.to_string())
  }
}

/// A username that passed both the pattern and the uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for Username {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Pattern check only. Callers that must hit storage for the uniqueness check
/// run this first so malformed input never reaches the database.
pub fn check_username_pattern(candidate: &str) -> Result<(), ValidationError> {
  if USERNAME_RE.is_match(candidate) {
    Ok(())
  } else {
    Err(ValidationError::InvalidPattern)
  }
}

/// `is_taken` answers whether the name exists already, ignoring case.
pub fn validate_username<F>(candidate: &str, is_taken: F) -> Result<Username, ValidationError>
where
  F: FnOnce(&str) -> bool,
{
  check_username_pattern(candidate)?;
  if is_taken(candidate) {
    return Err(ValidationError::Taken);
  }
  Ok(Username(candidate.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn existing(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
    move |candidate: &str| names.iter().any(|n| n.eq_ignore_ascii_case(candidate))
  }

  #[test]
  fn accepts_well_formed_names() {
    assert_eq!(validate_username("abcde", existing(&[])).unwrap().as_str(), "abcde");
    assert!(validate_username("a2345_", existing(&[])).is_ok());
    assert!(validate_username(&format!("a{}", "b".repeat(29)), existing(&[])).is_ok());
  }

  #[test]
  fn rejects_bad_patterns() {
    for bad in ["1abcde", "abcd", "_abcde", "abc de", "abcdé1", ""] {
      assert_eq!(
        validate_username(bad, existing(&[])),
        Err(ValidationError::InvalidPattern),
        "{bad:?} should fail the pattern"
      );
    }
    assert_eq!(
      validate_username(&format!("a{}", "b".repeat(30)), existing(&[])),
      Err(ValidationError::InvalidPattern)
    );
  }

  #[test]
  fn uniqueness_ignores_case() {
    assert_eq!(
      validate_username("drsmith1", existing(&["DrSmith1"])),
      Err(ValidationError::Taken)
    );
  }

  #[test]
  fn pattern_failure_wins_over_lookup() {
    let result = validate_username("1abcde", |_| panic!("lookup must not run"));
    assert_eq!(result, Err(ValidationError::InvalidPattern));
  }

  #[test]
  fn messages_match_form_wording() {
    assert_eq!(
      ValidationError::Taken.to_string(),
      "Username already exists. Please choose a different one."
    );
    assert!(ValidationError::InvalidPattern.to_string().starts_with("Invalid username."));
  }
}
