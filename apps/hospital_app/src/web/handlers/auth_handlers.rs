// apps/hospital_app/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use wardflow::{ContextData, PipelineResult};

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::session::{self, AdminOnly, Authorized, PatientOnly, SESSION_COOKIE};
use crate::web::view::{self, Flash};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct SignupPayload {
  pub username: String,
  pub email: String,
  pub password1: String,
  pub password2: String,
  #[serde(default)]
  pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StaffAccountPayload {
  pub role: Role,
  #[serde(flatten)]
  pub account: SignupPayload,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub username: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ChangePasswordPayload {
  pub new_password: String,
  pub confirm_password: String,
}

// --- Registration ---

async fn run_signup(app_state: &AppState, role: Role, payload: SignupPayload) -> Result<SignupCtxData, AppError> {
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.clone(),
    role,
    username: payload.username,
    email: payload.email,
    password1: payload.password1,
    password2: payload.password2,
    name: payload.name,
    validated_username: None,
    created_account: None,
    profile_id: None,
  });

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => Ok(ctx_data.snapshot()),
    Ok(PipelineResult::Stopped) => {
      warn!(role = role.label(), "Signup pipeline was stopped by a handler.");
      Err(AppError::Internal("Signup process was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!(role = role.label(), "Signup pipeline failed: {:?}", app_err);
      Err(app_err)
    }
  }
}

fn registered_redirect(final_ctx: &SignupCtxData) -> Result<HttpResponse, AppError> {
  let account = final_ctx
    .created_account
    .as_ref()
    .ok_or_else(|| AppError::Internal("Signup completed without creating an account.".to_string()))?;
  info!(account_id = %account.id, role = account.role.label(), "Registration successful.");
  Ok(view::redirect(
    "/login",
    vec![Flash::success(format!("Account was created for {}", account.username))],
  ))
}

#[instrument(name = "handler::patient_register", skip(app_state, payload), fields(username = %payload.username))]
pub async fn patient_register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SignupPayload>,
) -> Result<HttpResponse, AppError> {
  let final_ctx = run_signup(app_state.get_ref(), Role::Patient, payload.into_inner()).await?;
  registered_redirect(&final_ctx)
}

#[instrument(name = "handler::doctor_register", skip(app_state, payload), fields(username = %payload.username))]
pub async fn doctor_register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SignupPayload>,
) -> Result<HttpResponse, AppError> {
  let final_ctx = run_signup(app_state.get_ref(), Role::Doctor, payload.into_inner()).await?;
  registered_redirect(&final_ctx)
}

/// Hospital admins create staff accounts; patients and doctors sign up themselves.
#[instrument(
  name = "handler::create_staff_account",
  skip(app_state, payload, auth),
  fields(admin_id = %auth.actor.account_id, requested_role = payload.role.label())
)]
pub async fn create_staff_account_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<StaffAccountPayload>,
  auth: Authorized<AdminOnly>,
) -> Result<HttpResponse, AppError> {
  let StaffAccountPayload { role, account } = payload.into_inner();
  if !role.is_staff() {
    return Err(AppError::Validation(format!(
      "A hospital admin cannot create {} accounts.",
      role.label()
    )));
  }

  let final_ctx = run_signup(app_state.get_ref(), role, account).await?;
  let account = final_ctx
    .created_account
    .ok_or_else(|| AppError::Internal("Staff signup completed without an account.".to_string()))?;
  info!(account_id = %account.id, "Staff account created.");
  Ok(view::render(
    "hospital-admin-accounts",
    vec![Flash::success(format!("Account was created for {}", account.username))],
    json!({ "account": account }),
  ))
}

// --- Sessions ---

async fn run_signin(app_state: &AppState, portal: Role, payload: LoginPayload) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.clone(),
    portal,
    username: payload.username,
    password: payload.password,
    account: None,
    session_token: None,
  });

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let final_ctx = ctx_data.snapshot();
      let account = final_ctx.account.ok_or_else(|| {
        warn!("Signin pipeline completed but account was not set.");
        AppError::Auth("Signin completed without user identification.".to_string())
      })?;
      let token = final_ctx.session_token.ok_or_else(|| {
        warn!("Signin pipeline completed but session token was not generated.");
        AppError::Auth("Signin completed without session token generation.".to_string())
      })?;

      info!(account_id = %account.id, portal = portal.label(), "Signin successful.");
      let mut resp = view::redirect(account.role.dashboard_path(), Vec::new());
      resp
        .add_cookie(&session::session_cookie(&token))
        .map_err(|e| AppError::Internal(format!("Could not set session cookie: {}", e)))?;
      Ok(resp)
    }
    Ok(PipelineResult::Stopped) => {
      warn!(portal = portal.label(), "Signin pipeline was stopped by a handler.");
      Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()))
    }
    Err(app_err) => {
      warn!(portal = portal.label(), "Signin pipeline failed: {:?}", app_err);
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::patient_login", skip(app_state, payload), fields(username = %payload.username))]
pub async fn patient_login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  run_signin(app_state.get_ref(), Role::Patient, payload.into_inner()).await
}

#[instrument(name = "handler::doctor_login", skip(app_state, payload), fields(username = %payload.username))]
pub async fn doctor_login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  run_signin(app_state.get_ref(), Role::Doctor, payload.into_inner()).await
}

#[instrument(name = "handler::logout", skip(app_state, req))]
pub async fn logout_handler(app_state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
  if let Some(cookie) = req.cookie(SESSION_COOKIE) {
    let store = app_state.store.as_ref();
    if let Some(existing) = store.find_session(cookie.value()).await? {
      session::terminate_session(store, &existing.token, existing.account_id).await?;
      info!(account_id = %existing.account_id, "Logged out.");
    }
  }

  let mut resp = view::redirect("/login", vec![Flash::info("You have been logged out.")]);
  let expired = session::session_cookie("");
  resp
    .add_removal_cookie(&expired)
    .map_err(|e| AppError::Internal(format!("Could not expire session cookie: {}", e)))?;
  Ok(resp)
}

#[instrument(name = "handler::change_password", skip(app_state, payload, auth), fields(account_id = %auth.actor.account_id))]
pub async fn change_password_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ChangePasswordPayload>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  auth_service::check_new_password(&payload.new_password, &payload.confirm_password)?;
  let password_hash = auth_service::hash_password(&payload.new_password)?;
  app_state
    .store
    .update_password_hash(auth.actor.account_id, &password_hash)
    .await?;

  info!("Password changed.");
  Ok(view::redirect(
    "/patient/dashboard",
    vec![Flash::success("Your password has been changed.")],
  ))
}
