// apps/hospital_app/src/pipelines/mod.rs

//! Every multi-step workflow of the service, each registered as a `wardflow`
//! pipeline keyed by its context type.

use crate::errors::AppError;
use wardflow::{FlowResult, Registry};

pub mod common_steps;
pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod hospital_registration_pipeline;
pub mod password_reset_pipeline;
pub mod prescription_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers all pipelines. Called once at startup, before the server binds.
pub fn register_all_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(registry)?;
  signin_pipeline::register_signin_pipeline(registry)?;
  password_reset_pipeline::register_password_reset_pipelines(registry)?;
  cart_pipeline::register_cart_pipelines(registry)?;
  checkout_pipeline::register_checkout_pipeline(registry)?;
  hospital_registration_pipeline::register_hospital_registration_pipeline(registry)?;
  prescription_pipeline::register_prescription_pipeline(registry)?;

  tracing::info!("All application pipelines registered.");
  Ok(())
}
