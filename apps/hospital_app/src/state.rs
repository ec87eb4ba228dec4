// apps/hospital_app/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::mailer::Mailer;
use crate::services::templates::Templates;
use crate::store::ClinicStore;
use std::sync::Arc;
use wardflow::Registry;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn ClinicStore>,
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub mailer: Arc<dyn Mailer>,
  pub templates: Arc<Templates>,
}
