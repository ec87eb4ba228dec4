// apps/hospital_app/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewAccount, Role};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::{auth_service, username};
use tracing::{event, info, warn, Level};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

/// One pipeline serves every role; the profile step branches on `role`.
pub fn register_signup_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_username_signup", false, None),
    ("validate_credentials_signup", false, None),
    ("create_account_signup", false, None),
    ("create_profile_signup", false, None),
  ]);

  signup_p.on_root("validate_username_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (candidate, store) = {
        let guard = ctx_data.read();
        (guard.username.trim().to_string(), guard.app_state.store.clone())
      };

      username::check_username_pattern(&candidate)?;
      let taken = store.username_taken(&candidate).await?;
      let validated = username::validate_username(&candidate, |_| taken).map_err(|e| {
        warn!(username = %candidate, "Signup rejected: {}", e);
        AppError::from(e)
      })?;

      event!(Level::DEBUG, username = %validated, "Username accepted.");
      ctx_data.write().validated_username = Some(validated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("validate_credentials_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let email = guard.email.trim();
      if email.is_empty() || !email.contains('@') {
        warn!("Invalid email format provided for signup.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      auth_service::check_new_password(&guard.password1, &guard.password2)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("create_account_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (store, username, email, password, role) = {
        let guard = ctx_data.read();
        let username = guard
          .validated_username
          .clone()
          .ok_or_else(|| AppError::Internal("Username not validated before account creation.".to_string()))?;
        (
          guard.app_state.store.clone(),
          username,
          guard.email.trim().to_string(),
          guard.password1.clone(),
          guard.role,
        )
      };

      let password_hash = auth_service::hash_password(&password)?;
      let account = store
        .insert_account(NewAccount {
          username: username.into_inner(),
          email,
          password_hash,
          role,
        })
        .await?;

      info!(account_id = %account.id, role = role.label(), "Account created.");
      ctx_data.write().created_account = Some(account);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("create_profile_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (store, account_id, role, name) = {
        let guard = ctx_data.read();
        let account_id = guard
          .created_account
          .as_ref()
          .map(|a| a.id)
          .ok_or_else(|| AppError::Internal("Account missing before profile creation.".to_string()))?;
        (guard.app_state.store.clone(), account_id, guard.role, guard.name.clone())
      };

      let profile_id = match role {
        Role::Patient => Some(store.insert_patient(account_id, name).await?.id),
        Role::Doctor => Some(store.insert_doctor(account_id, name).await?.id),
        Role::HospitalAdmin | Role::LabTechnician | Role::Pharmacist => None,
      };
      if let Some(id) = profile_id {
        event!(Level::DEBUG, %account_id, profile_id = %id, "Profile created.");
      }
      ctx_data.write().profile_id = profile_id;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
  Ok(())
}
