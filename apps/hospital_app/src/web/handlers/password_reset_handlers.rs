// apps/hospital_app/src/web/handlers/password_reset_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use wardflow::{ContextData, PipelineResult};

use crate::errors::AppError;
use crate::pipelines::contexts::{PasswordResetConfirmCtxData, PasswordResetRequestCtxData};
use crate::services::reset_token::{self, PasswordResetTokens};
use crate::state::AppState;
use crate::web::view::{self, Flash};

#[derive(Deserialize, Debug)]
pub struct ResetRequestPayload {
  pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetConfirmPayload {
  pub new_password: String,
  pub confirm_password: String,
}

#[instrument(name = "handler::password_reset_request", skip(app_state, payload))]
pub async fn password_reset_request_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ResetRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(PasswordResetRequestCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.into_inner().email,
    account: None,
    uid: None,
    token: None,
    mail: None,
    message_id: None,
  });

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let message_id = ctx_data.read().message_id.clone().unwrap_or_default();
      info!(%message_id, "Password reset mail sent.");
      Ok(view::redirect("/password-reset/done", Vec::new()))
    }
    Ok(PipelineResult::Stopped) => Err(AppError::Internal("Password reset request was halted.".to_string())),
    // The form is shown again with the reason; every other failure propagates.
    Err(AppError::Validation(reason)) => {
      warn!(%reason, "Password reset request rejected.");
      Ok(view::render("reset_password", vec![Flash::error(reason)], json!({})))
    }
    Err(app_err) => Err(app_err),
  }
}

pub async fn password_reset_done_handler() -> HttpResponse {
  view::render(
    "password_reset_sent",
    vec![Flash::info(
      "We've emailed you instructions for setting your password, if an account exists with the email you entered.",
    )],
    json!({}),
  )
}

/// Landing page of the mailed link. Only reports whether the link still works.
#[instrument(name = "handler::password_reset_link", skip(app_state, path))]
pub async fn password_reset_link_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
  let (uidb64, token) = path.into_inner();
  let account = match reset_token::decode_uid(&uidb64) {
    Some(id) => app_state.store.find_account(id).await?,
    None => None,
  };
  let config = &app_state.config;
  let tokens = PasswordResetTokens::new(config.password_reset_secret.clone(), config.password_reset_timeout_secs);
  let validlink = account
    .as_ref()
    .map(|a| tokens.check_token(a, &token, Utc::now()))
    .unwrap_or(false);

  Ok(view::render("password_reset_form", Vec::new(), json!({ "validlink": validlink })))
}

#[instrument(name = "handler::password_reset_confirm", skip(app_state, path, payload))]
pub async fn password_reset_confirm_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
  payload: web::Json<ResetConfirmPayload>,
) -> Result<HttpResponse, AppError> {
  let (uidb64, token) = path.into_inner();
  let payload = payload.into_inner();
  let ctx_data = ContextData::new(PasswordResetConfirmCtxData {
    app_state: app_state.get_ref().clone(),
    uidb64,
    token,
    new_password: payload.new_password,
    confirm_password: payload.confirm_password,
    account: None,
    password_changed: false,
  });

  match app_state.registry.run(ctx_data.clone()).await? {
    PipelineResult::Completed => Ok(view::redirect(
      "/login",
      vec![Flash::success("Your password has been set. You may go ahead and log in now.")],
    )),
    PipelineResult::Stopped => Err(AppError::Internal("Password reset was halted.".to_string())),
  }
}
