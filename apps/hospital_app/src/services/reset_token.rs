// apps/hospital_app/src/services/reset_token.rs

//! One-time password-reset tokens.
//!
//! A token is `<timestamp base36>-<mac>`, where the MAC is HMAC-SHA256 over the
//! account id, its current password hash, its last login, and the timestamp.
//! Changing the password or logging in again invalidates every outstanding
//! token without any server-side bookkeeping.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Account;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct PasswordResetTokens {
  secret: Vec<u8>,
  timeout_secs: i64,
}

impl PasswordResetTokens {
  pub fn new(secret: Vec<u8>, timeout_secs: i64) -> Self {
    Self { secret, timeout_secs }
  }

  fn mac_for(&self, account: &Account, timestamp: i64) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(&self.secret)
      .map_err(|e| AppError::Internal(format!("Reset token key rejected: {}", e)))?;
    let last_login = account
      .last_login
      .map(|t| t.timestamp_micros().to_string())
      .unwrap_or_default();
    mac.update(account.id.as_bytes());
    mac.update(b"|");
    mac.update(account.password_hash.as_bytes());
    mac.update(b"|");
    mac.update(last_login.as_bytes());
    mac.update(b"|");
    mac.update(timestamp.to_string().as_bytes());
    Ok(mac)
  }

  pub fn make_token(&self, account: &Account, now: DateTime<Utc>) -> Result<String, AppError> {
    let timestamp = now.timestamp();
    let signature = self.mac_for(account, timestamp)?.finalize().into_bytes();
    Ok(format!("{}-{}", to_base36(timestamp), URL_SAFE_NO_PAD.encode(signature)))
  }

  /// False for malformed, forged, stale, or already-spent tokens.
  pub fn check_token(&self, account: &Account, token: &str, now: DateTime<Utc>) -> bool {
    let Some((ts_part, sig_part)) = token.split_once('-') else {
      return false;
    };
    let Some(timestamp) = from_base36(ts_part) else {
      return false;
    };
    let Ok(signature) = URL_SAFE_NO_PAD.decode(sig_part) else {
      return false;
    };
    let Ok(mac) = self.mac_for(account, timestamp) else {
      return false;
    };
    if mac.verify_slice(&signature).is_err() {
      return false;
    }
    let age = now.timestamp() - timestamp;
    (0..=self.timeout_secs).contains(&age)
  }
}

/// URL-safe base64 of the account id's textual form.
pub fn encode_uid(id: Uuid) -> String {
  URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Option<Uuid> {
  let raw = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
  let text = String::from_utf8(raw).ok()?;
  Uuid::parse_str(&text).ok()
}

fn to_base36(mut n: i64) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  if n <= 0 {
    return "0".to_string();
  }
  let mut out = Vec::new();
  while n > 0 {
    out.push(DIGITS[(n % 36) as usize]);
    n /= 36;
  }
  out.reverse();
  String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<i64> {
  if s.is_empty() || s.len() > 13 {
    return None;
  }
  i64::from_str_radix(s, 36).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Role;
  use chrono::Duration;

  fn account() -> Account {
    Account {
      id: Uuid::new_v4(),
      username: "patient_one".to_string(),
      email: "p1@example.com".to_string(),
      password_hash: "$argon2id$v=19$stub".to_string(),
      role: Role::Patient,
      login_status: false,
      last_login: None,
      created_at: Utc::now(),
    }
  }

  fn tokens() -> PasswordResetTokens {
    PasswordResetTokens::new(b"0123456789abcdef0123456789abcdef".to_vec(), 3600)
  }

  #[test]
  fn token_verifies_for_its_account() {
    let acct = account();
    let now = Utc::now();
    let token = tokens().make_token(&acct, now).unwrap();
    assert!(tokens().check_token(&acct, &token, now + Duration::seconds(10)));
  }

  #[test]
  fn token_is_spent_once_password_changes() {
    let mut acct = account();
    let now = Utc::now();
    let token = tokens().make_token(&acct, now).unwrap();
    acct.password_hash = "$argon2id$v=19$other".to_string();
    assert!(!tokens().check_token(&acct, &token, now));
  }

  #[test]
  fn token_fails_after_new_login() {
    let mut acct = account();
    let now = Utc::now();
    let token = tokens().make_token(&acct, now).unwrap();
    acct.last_login = Some(now);
    assert!(!tokens().check_token(&acct, &token, now));
  }

  #[test]
  fn token_expires() {
    let acct = account();
    let now = Utc::now();
    let token = tokens().make_token(&acct, now).unwrap();
    assert!(!tokens().check_token(&acct, &token, now + Duration::seconds(3601)));
  }

  #[test]
  fn token_does_not_cross_accounts_or_secrets() {
    let acct = account();
    let now = Utc::now();
    let token = tokens().make_token(&acct, now).unwrap();
    assert!(!tokens().check_token(&account(), &token, now));
    let other = PasswordResetTokens::new(b"ffffffffffffffffffffffffffffffff".to_vec(), 3600);
    assert!(!other.check_token(&acct, &token, now));
  }

  #[test]
  fn malformed_tokens_are_rejected() {
    let acct = account();
    for bad in ["", "-", "abc", "zz-!!!", "0-AAAA"] {
      assert!(!tokens().check_token(&acct, bad, Utc::now()), "{bad:?}");
    }
  }

  #[test]
  fn uid_encoding() {
    let id = Uuid::new_v4();
    assert_eq!(decode_uid(&encode_uid(id)), Some(id));
    assert_eq!(decode_uid("not-base64!"), None);
  }

  #[test]
  fn base36_matches_radix_parse() {
    assert_eq!(to_base36(0), "0");
    assert_eq!(to_base36(35), "z");
    assert_eq!(from_base36(&to_base36(1_700_000_000)), Some(1_700_000_000));
  }
}
