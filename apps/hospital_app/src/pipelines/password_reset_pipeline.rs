// apps/hospital_app/src/pipelines/password_reset_pipeline.rs

//! Reset request (mint token, render and send the mail) and reset confirm
//! (check token, store the new hash).

use crate::errors::AppError;
use crate::pipelines::contexts::{PasswordResetConfirmCtxData, PasswordResetRequestCtxData};
use crate::services::mailer::OutgoingMail;
use crate::services::reset_token::{self, PasswordResetTokens};
use crate::services::templates::{MailUser, ResetMailContext};
use crate::services::auth_service;
use chrono::Utc;
use tracing::{info, instrument, warn};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

pub const RESET_SUBJECT: &str = "Password Reset Requested";

pub fn register_password_reset_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  register_request_pipeline(registry)?;
  register_confirm_pipeline(registry)?;
  Ok(())
}

fn register_request_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<PasswordResetRequestCtxData, AppError>::new(&[
    ("find_unique_account_reset", false, None),
    ("mint_token_reset", false, None),
    ("render_mail_reset", false, None),
    ("send_mail_reset", false, None),
  ]);

  p.on_root("find_unique_account_reset", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let (store, email) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.email.trim().to_string())
      };
      if email.is_empty() {
        return Err(AppError::Validation("Enter a valid email address.".to_string()));
      }

      let mut matches = store.find_accounts_by_email(&email).await?;
      if matches.len() != 1 {
        warn!(found = matches.len(), "Reset requested for an email without exactly one account.");
        return Err(AppError::Validation(
          "No unique account is registered with that email address.".to_string(),
        ));
      }
      ctx_data.write().account = matches.pop();
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("mint_token_reset", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let config = guard.app_state.config.clone();
      let account = guard
        .account
        .clone()
        .ok_or_else(|| AppError::Internal("Account not resolved before token minting.".to_string()))?;
      let tokens = PasswordResetTokens::new(config.password_reset_secret.clone(), config.password_reset_timeout_secs);
      let token = tokens.make_token(&account, Utc::now())?;
      guard.uid = Some(reset_token::encode_uid(account.id));
      guard.token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("render_mail_reset", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let config = guard.app_state.config.clone();
      let templates = guard.app_state.templates.clone();
      let (account, uid, token) = match (&guard.account, &guard.uid, &guard.token) {
        (Some(a), Some(u), Some(t)) => (a.clone(), u.clone(), t.clone()),
        _ => return Err(AppError::Internal("Token not minted before rendering.".to_string())),
      };
      let (protocol, domain) = config.protocol_and_domain();

      let (html_body, text_body) = templates.render_reset_mail(&ResetMailContext {
        email: &account.email,
        domain: &domain,
        site_name: &config.site_name,
        uid: &uid,
        user: MailUser {
          username: &account.username,
          email: &account.email,
        },
        token: &token,
        protocol: &protocol,
      })?;

      guard.mail = Some(OutgoingMail {
        to: account.email.clone(),
        from: config.mail_sender.clone(),
        subject: RESET_SUBJECT.to_string(),
        html_body,
        text_body,
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("send_mail_reset", send_reset_mail)?;

  registry.register_pipeline(p);
  Ok(())
}

#[instrument(name = "password_reset::send_mail", skip_all, err(Display))]
async fn send_reset_mail(ctx_data: ContextData<PasswordResetRequestCtxData>) -> Result<PipelineControl, AppError> {
  let (mailer, mail) = {
    let guard = ctx_data.read();
    let mail = guard
      .mail
      .clone()
      .ok_or_else(|| AppError::Internal("Mail not rendered before sending.".to_string()))?;
    (guard.app_state.mailer.clone(), mail)
  };

  let message_id = mailer.send(&mail).await?;
  info!(%message_id, "Password reset mail sent.");
  ctx_data.write().message_id = Some(message_id);
  Ok(PipelineControl::Continue)
}

fn register_confirm_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<PasswordResetConfirmCtxData, AppError>::new(&[
    ("resolve_account_confirm", false, None),
    ("check_token_confirm", false, None),
    ("validate_new_password_confirm", false, None),
    ("store_new_password_confirm", false, None),
  ]);

  p.on_root("resolve_account_confirm", |ctx_data: ContextData<PasswordResetConfirmCtxData>| {
    Box::pin(async move {
      let (store, uidb64) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.uidb64.clone())
      };
      let invalid = || AppError::Validation("The password reset link was invalid.".to_string());

      let account_id = reset_token::decode_uid(&uidb64).ok_or_else(invalid)?;
      let account = store.find_account(account_id).await?.ok_or_else(invalid)?;
      ctx_data.write().account = Some(account);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("check_token_confirm", |ctx_data: ContextData<PasswordResetConfirmCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let config = &guard.app_state.config;
      let tokens = PasswordResetTokens::new(config.password_reset_secret.clone(), config.password_reset_timeout_secs);
      let valid = guard
        .account
        .as_ref()
        .map(|account| tokens.check_token(account, &guard.token, Utc::now()))
        .unwrap_or(false);
      if !valid {
        warn!("Rejected password reset token.");
        return Err(AppError::Validation(
          "The password reset link was invalid, possibly because it has already been used.".to_string(),
        ));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("validate_new_password_confirm", |ctx_data: ContextData<PasswordResetConfirmCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      auth_service::check_new_password(&guard.new_password, &guard.confirm_password)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("store_new_password_confirm", |ctx_data: ContextData<PasswordResetConfirmCtxData>| {
    Box::pin(async move {
      let (store, account_id, password) = {
        let guard = ctx_data.read();
        let account_id = guard
          .account
          .as_ref()
          .map(|a| a.id)
          .ok_or_else(|| AppError::Internal("Account not resolved before password update.".to_string()))?;
        (guard.app_state.store.clone(), account_id, guard.new_password.clone())
      };

      let password_hash = auth_service::hash_password(&password)?;
      store.update_password_hash(account_id, &password_hash).await?;
      info!(%account_id, "Password reset completed.");
      ctx_data.write().password_changed = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}
