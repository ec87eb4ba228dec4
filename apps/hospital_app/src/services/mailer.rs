// apps/hospital_app/src/services/mailer.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub html_body: String,
  pub text_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
  #[error("header '{0}' contains a line break")]
  BadHeader(&'static str),
  #[error("transport failure: {0}")]
  Transport(String),
}

impl From<MailError> for AppError {
  fn from(err: MailError) -> Self {
    match err {
      MailError::BadHeader(name) => AppError::BadHeader(name.to_string()),
      MailError::Transport(m) => AppError::Mail(m),
    }
  }
}

/// Rejects header injection before anything reaches a transport.
pub fn check_headers(mail: &OutgoingMail) -> Result<(), MailError> {
  for (name, value) in [("subject", &mail.subject), ("from", &mail.from), ("to", &mail.to)] {
    if value.contains('\r') || value.contains('\n') {
      return Err(MailError::BadHeader(name));
    }
  }
  Ok(())
}

#[async_trait]
pub trait Mailer: Send + Sync {
  /// Returns the transport's message id.
  async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError>;
}

/// Development transport: validates headers and logs instead of delivering.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  #[instrument(name = "LogMailer::send", skip_all, fields(to = %mail.to, subject = %mail.subject))]
  async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
    check_headers(mail)?;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    let preview: String = mail.text_body.chars().take(50).collect();
    info!(%message_id, from = %mail.from, body_preview = %preview, "Mock email sent.");
    Ok(message_id)
  }
}

/// Keeps every accepted message in memory. Used by integration tests.
#[derive(Debug, Default)]
pub struct RecordingMailer {
  sent: Mutex<Vec<OutgoingMail>>,
  fail_with: Mutex<Option<String>>,
}

impl RecordingMailer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every later `send` fails with a transport error carrying `reason`.
  pub fn fail_transport(&self, reason: &str) {
    *self.fail_with.lock() = Some(reason.to_string());
  }

  pub fn sent(&self) -> Vec<OutgoingMail> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
    check_headers(mail)?;
    if let Some(reason) = self.fail_with.lock().clone() {
      warn!(%reason, "Recording mailer simulating transport failure.");
      return Err(MailError::Transport(reason));
    }
    let mut sent = self.sent.lock();
    sent.push(mail.clone());
    Ok(format!("recorded_{}", sent.len()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mail(subject: &str) -> OutgoingMail {
    OutgoingMail {
      to: "p1@example.com".to_string(),
      from: "admin@example.com".to_string(),
      subject: subject.to_string(),
      html_body: "<p>hi</p>".to_string(),
      text_body: "hi".to_string(),
    }
  }

  #[test]
  fn newline_in_subject_is_a_bad_header() {
    assert!(matches!(check_headers(&mail("Reset\nBcc: x@y")), Err(MailError::BadHeader("subject"))));
    assert!(matches!(check_headers(&mail("Reset\r")), Err(MailError::BadHeader("subject"))));
    assert!(check_headers(&mail("Password Reset Requested")).is_ok());
  }

  #[tokio::test]
  async fn recording_mailer_keeps_messages_and_can_fail() {
    let mailer = RecordingMailer::new();
    mailer.send(&mail("one")).await.unwrap();
    assert_eq!(mailer.sent().len(), 1);
    mailer.fail_transport("smtp down");
    assert!(matches!(mailer.send(&mail("two")).await, Err(MailError::Transport(_))));
    assert_eq!(mailer.sent().len(), 1);
  }
}
