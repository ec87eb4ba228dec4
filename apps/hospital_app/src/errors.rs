// apps/hospital_app/src/errors.rs

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use wardflow::FlowError;

use crate::web::session::SESSION_COOKIE;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// Wrong role or no session. The session has already been torn down by the
  /// time this is raised; the response only redirects and expires the cookie.
  #[error("Not Authorized: {0}")]
  Unauthorized(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Invalid mail header: {0}")]
  BadHeader(String),

  #[error("Mail Transport Error: {0}")]
  Mail(String),

  #[error("PDF Rendering Error: {0}")]
  Pdf(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Template Error: {0}")]
  Template(#[from] tera::Error),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[source]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Handler failures come back from the engine wrapped in `HandlerError`; unwrap
// them so an `AppError` raised inside a step keeps its HTTP mapping.
impl From<FlowError> for AppError {
  fn from(err: FlowError) -> Self {
    match err {
      FlowError::HandlerError { source } => AppError::from(source),
      other => AppError::Workflow { source: other },
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<AppError>() {
      Ok(app_err) => return app_err,
      Err(err) => err,
    };
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

fn error_flash(text: &str) -> serde_json::Value {
  json!([{ "level": "error", "text": text }])
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::BadHeader(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Unauthorized(_) => StatusCode::SEE_OTHER,
      AppError::NotFound(_) | AppError::Pdf(_) => StatusCode::NOT_FOUND,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m, "messages": error_flash(m)})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m, "messages": error_flash(m)})),
      AppError::Unauthorized(m) => {
        let mut resp = HttpResponse::SeeOther()
          .insert_header((header::LOCATION, "/login"))
          .json(json!({"view": "login", "messages": [{"level": "info", "text": m}]}));
        let expired = Cookie::build(SESSION_COOKIE, "").path("/").finish();
        if let Err(e) = resp.add_removal_cookie(&expired) {
          tracing::warn!(error = %e, "Could not attach session removal cookie.");
        }
        resp
      }
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m, "messages": error_flash(m)})),
      AppError::BadHeader(_) => HttpResponse::BadRequest()
        .content_type("text/plain; charset=utf-8")
        .body("Invalid header found."),
      AppError::Pdf(_) => HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body("Not Found"),
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"error": m, "messages": error_flash(m)})),
      AppError::Mail(_) => HttpResponse::InternalServerError().json(json!({"error": "Email service error"})),
      AppError::Template(_) => HttpResponse::InternalServerError().json(json!({"error": "Template rendering failed"})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Workflow { source } => {
        tracing::error!(workflow_error = ?source, "Workflow error details");
        HttpResponse::InternalServerError().json(json!({"error": "Workflow processing error"}))
      }
      AppError::Internal(_) => HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"})),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
