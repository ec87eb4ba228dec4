// apps/hospital_app/src/lib.rs

//! Hospital management service: accounts, the patient area, a hospital
//! directory, and the lab-test ordering cart. Every multi-step workflow runs
//! as a `wardflow` pipeline.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use std::sync::Arc;
use wardflow::Registry;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::services::mailer::Mailer;
use crate::services::templates::Templates;
use crate::state::AppState;
use crate::store::ClinicStore;

/// Wires the store, mailer and templates together and registers every pipeline.
pub fn build_app_state(config: AppConfig, store: Arc<dyn ClinicStore>, mailer: Arc<dyn Mailer>) -> Result<AppState> {
  let registry = Arc::new(Registry::<AppError>::new());
  pipelines::register_all_pipelines(&registry)?;
  let templates = Arc::new(Templates::load()?);

  Ok(AppState {
    store,
    registry,
    config: Arc::new(config),
    mailer,
    templates,
  })
}
