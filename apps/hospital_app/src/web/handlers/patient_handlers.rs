// apps/hospital_app/src/web/handlers/patient_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::state::AppState;
use crate::web::session::{Authorized, PatientOnly};
use crate::web::view::{self, Flash};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
pub const INVALID_IMAGE: &str = "Uploaded file is not a valid image. Please try again.";

#[derive(Deserialize, Debug, Default)]
pub struct ProfilePayload {
  pub name: Option<String>,
  pub dob: Option<NaiveDate>,
  pub age: Option<i32>,
  pub blood_group: Option<String>,
  pub phone_number: Option<String>,
  pub address: Option<String>,
  pub weight_kg: Option<i32>,
  pub nid: Option<String>,
  pub history: Option<String>,
  /// Stored path of an already uploaded image.
  pub featured_image: Option<String>,
}

fn looks_like_image(path: &str) -> bool {
  Path::new(path)
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

#[instrument(name = "handler::patient_dashboard", skip(app_state, auth), fields(account_id = %auth.actor.account_id))]
pub async fn patient_dashboard_handler(
  app_state: web::Data<AppState>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let patient = common_steps::patient_for(store, &auth.actor).await?;
  let reports = store.reports_for_patient(patient.id).await?;
  let prescriptions = store.prescriptions_for_patient(patient.id).await?;
  let appointments = store.active_appointments_for_patient(patient.id).await?;

  Ok(view::render(
    "patient-dashboard",
    Vec::new(),
    json!({
      "patient": patient,
      "report": reports,
      "prescription": prescriptions,
      "appointments": appointments,
    }),
  ))
}

#[instrument(name = "handler::profile_settings", skip(app_state, auth), fields(account_id = %auth.actor.account_id))]
pub async fn profile_settings_handler(
  app_state: web::Data<AppState>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let patient = common_steps::patient_for(app_state.store.as_ref(), &auth.actor).await?;
  Ok(view::render("profile-settings", Vec::new(), json!({ "patient": patient })))
}

/// Replaces every editable profile field. The image path is kept unless a new
/// one is supplied.
#[instrument(name = "handler::update_profile", skip(app_state, payload, auth), fields(account_id = %auth.actor.account_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ProfilePayload>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let mut patient = common_steps::patient_for(store, &auth.actor).await?;
  let payload = payload.into_inner();

  if let Some(image) = payload.featured_image.as_deref().filter(|p| !p.trim().is_empty()) {
    if !looks_like_image(image) {
      warn!(image, "Rejected profile image.");
      return Ok(view::redirect("/patient/profile", vec![Flash::error(INVALID_IMAGE)]));
    }
    patient.featured_image = Some(image.to_string());
  }

  patient.name = payload.name;
  patient.dob = payload.dob;
  patient.age = payload.age;
  patient.blood_group = payload.blood_group;
  patient.phone_number = payload.phone_number;
  patient.address = payload.address;
  patient.weight_kg = payload.weight_kg;
  patient.nid = payload.nid;
  patient.history = payload.history;

  store.update_patient(&patient).await?;
  info!(patient_id = %patient.id, "Profile updated.");
  Ok(view::redirect("/patient/dashboard", vec![Flash::success("Profile Settings Changed!")]))
}
