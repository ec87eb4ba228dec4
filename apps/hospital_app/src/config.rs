// apps/hospital_app/src/config.rs

use crate::errors::{AppError, Result};
use rand_core::{OsRng, RngCore};
use dotenvy::dotenv;
use std::env;

/// Three days, matching the usual reset-link lifetime.
pub const DEFAULT_RESET_TIMEOUT_SECS: i64 = 259_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl LogFormat {
  /// `json` (any case) selects JSON lines; everything else is human-readable.
  pub fn parse(value: &str) -> Self {
    if value.trim().eq_ignore_ascii_case("json") {
      LogFormat::Json
    } else {
      LogFormat::Pretty
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Without a database URL the service runs on the in-memory store.
  pub database_url: Option<String>,
  pub app_base_url: String,
  pub site_name: String,
  pub mail_sender: String,
  pub password_reset_secret: Vec<u8>,
  pub password_reset_timeout_secs: i64,
  pub mock_payment_account_id: String,
  pub seed_db: bool,
  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let site_name = get_env("SITE_NAME").unwrap_or_else(|_| "Website".to_string());
    let mail_sender = get_env("MAIL_SENDER").unwrap_or_else(|_| "admin@example.com".to_string());

    let password_reset_secret = match get_env("PASSWORD_RESET_SECRET") {
      Ok(secret) if secret.len() >= 16 => secret.into_bytes(),
      Ok(_) => {
        return Err(AppError::Config(
          "PASSWORD_RESET_SECRET must be at least 16 bytes".to_string(),
        ))
      }
      Err(_) => {
        tracing::warn!("PASSWORD_RESET_SECRET not set; reset links will not survive a restart.");
        let mut secret = vec![0u8; 32];
        OsRng.fill_bytes(&mut secret);
        secret
      }
    };
    let password_reset_timeout_secs = get_env("PASSWORD_RESET_TIMEOUT_SECS")
      .unwrap_or_else(|_| DEFAULT_RESET_TIMEOUT_SECS.to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid PASSWORD_RESET_TIMEOUT_SECS: {}", e)))?;

    let mock_payment_account_id = get_env("MOCK_PAYMENT_ACCOUNT_ID").unwrap_or_else(|_| "mock_lab_acct".to_string());

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    let log_format = LogFormat::parse(&get_env("LOG_FORMAT").unwrap_or_default());

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      site_name,
      mail_sender,
      password_reset_secret,
      password_reset_timeout_secs,
      mock_payment_account_id,
      seed_db,
      log_format,
    })
  }

  /// Scheme and authority of `app_base_url`, as used in outgoing links.
  pub fn protocol_and_domain(&self) -> (String, String) {
    match self.app_base_url.split_once("://") {
      Some((protocol, rest)) => (protocol.to_string(), rest.trim_end_matches('/').to_string()),
      None => ("http".to_string(), self.app_base_url.trim_end_matches('/').to_string()),
    }
  }
}
