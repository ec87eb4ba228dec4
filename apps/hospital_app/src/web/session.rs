// apps/hospital_app/src/web/session.rs

//! Session resolution and the role gate.
//!
//! `Authorized<R>` is the only way a gated handler learns who is calling. A
//! request whose session role is not admitted by `R` has its session deleted
//! and the account marked offline before the handler is ever reached.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::{Actor, Role};
use crate::store::ClinicStore;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "hms_session";
pub const NOT_AUTHORIZED: &str = "Not Authorized";

/// Which roles a route admits.
pub trait RoleRule {
  fn admits(role: Role) -> bool;
}

pub struct PatientOnly;
pub struct DoctorOnly;
pub struct AdminOnly;
pub struct PatientOrDoctor;

impl RoleRule for PatientOnly {
  fn admits(role: Role) -> bool {
    matches!(role, Role::Patient)
  }
}

impl RoleRule for DoctorOnly {
  fn admits(role: Role) -> bool {
    matches!(role, Role::Doctor)
  }
}

impl RoleRule for AdminOnly {
  fn admits(role: Role) -> bool {
    matches!(role, Role::HospitalAdmin)
  }
}

impl RoleRule for PatientOrDoctor {
  fn admits(role: Role) -> bool {
    matches!(role, Role::Patient | Role::Doctor)
  }
}

#[derive(Debug)]
pub struct Authorized<R> {
  pub actor: Actor,
  pub token: String,
  _rule: PhantomData<fn() -> R>,
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish()
}

/// Deletes the session and marks its account offline.
pub async fn terminate_session(store: &dyn ClinicStore, token: &str, account_id: uuid::Uuid) -> Result<(), AppError> {
  store.delete_session(token).await?;
  store.set_login_status(account_id, false).await?;
  debug!(%account_id, "Session terminated.");
  Ok(())
}

impl<R: RoleRule + 'static> FromRequest for Authorized<R> {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
    let path = req.path().to_string();

    Box::pin(async move {
      let app_state = app_state.ok_or_else(|| AppError::Internal("Application state not configured.".to_string()))?;
      let Some(token) = token.filter(|t| !t.is_empty()) else {
        debug!(%path, "No session cookie on gated route.");
        return Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()));
      };
      let Some(session) = app_state.store.find_session(&token).await? else {
        debug!(%path, "Unknown session token on gated route.");
        return Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()));
      };

      if !R::admits(session.role) {
        warn!(%path, account_id = %session.account_id, role = session.role.label(), "Role not admitted; ending session.");
        terminate_session(app_state.store.as_ref(), &token, session.account_id).await?;
        return Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()));
      }

      Ok(Authorized {
        actor: Actor {
          account_id: session.account_id,
          role: session.role,
        },
        token,
        _rule: PhantomData,
      })
    })
  }
}
