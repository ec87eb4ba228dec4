// apps/hospital_app/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use tracing::{event, info, warn, Level};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Sign-in for one portal. Each portal admits a single role; the caller sets
/// `SigninCtxData::portal`.
pub fn register_signin_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_account_signin", false, None),
    ("verify_password_signin", false, None),
    ("check_portal_role_signin", false, None),
    ("issue_session_signin", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.username.trim().is_empty() || guard.password.is_empty() {
        warn!("Empty username or password provided for sign-in.");
        return Err(AppError::Validation("Username and password are required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  signin_p.on_root("fetch_account_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (username, password, store) = {
        let guard = ctx_data.read();
        (guard.username.trim().to_string(), guard.password.clone(), guard.app_state.store.clone())
      };

      event!(Level::DEBUG, %username, "Fetching account for sign-in.");
      match store.find_account_by_username(&username).await? {
        Some(account) => {
          ctx_data.write().account = Some(account);
          Ok(PipelineControl::Continue)
        }
        None => {
          auth_service::verify_against_dummy(&password);
          warn!(%username, "Sign-in attempt for unknown username.");
          Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
        }
      }
    })
  })?;

  signin_p.on_root("verify_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password) = {
        let guard = ctx_data.read();
        let stored_hash = guard.account.as_ref().map(|a| a.password_hash.clone()).unwrap_or_default();
        (stored_hash, guard.password.clone())
      };

      if auth_service::verify_password(&stored_hash, &password)? {
        Ok(PipelineControl::Continue)
      } else {
        warn!("Password mismatch during sign-in.");
        Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
      }
    })
  })?;

  signin_p.on_root("check_portal_role_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (store, account_id, role, portal) = {
        let guard = ctx_data.read();
        let account = guard
          .account
          .as_ref()
          .ok_or_else(|| AppError::Internal("Account not loaded before role check.".to_string()))?;
        (guard.app_state.store.clone(), account.id, account.role, guard.portal)
      };

      if role == portal {
        return Ok(PipelineControl::Continue);
      }
      // Right password, wrong door: the account ends up logged out.
      warn!(%account_id, actual = role.label(), portal = portal.label(), "Sign-in through the wrong portal.");
      store.set_login_status(account_id, false).await?;
      Err(AppError::Unauthorized(format!("Invalid credentials. Not a {}", portal.label())))
    })
  })?;

  signin_p.on_root("issue_session_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (store, account_id, role) = {
        let guard = ctx_data.read();
        let account = guard
          .account
          .as_ref()
          .ok_or_else(|| AppError::Internal("Account not loaded before session issue.".to_string()))?;
        (guard.app_state.store.clone(), account.id, account.role)
      };

      let token = auth_service::new_session_token();
      store.create_session(account_id, role, &token).await?;
      store.set_login_status(account_id, true).await?;
      info!(%account_id, role = role.label(), "Session issued.");
      ctx_data.write().session_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
  Ok(())
}
