// apps/hospital_app/src/web/handlers/doctor_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;
use wardflow::{ContextData, PipelineResult};

use crate::errors::AppError;
use crate::models::NewMedicine;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CreatePrescriptionCtxData, RequestedTest};
use crate::state::AppState;
use crate::web::session::{Authorized, DoctorOnly};
use crate::web::view::{self, Flash};

#[derive(Deserialize, Debug)]
pub struct MedicinePayload {
  pub medicine_name: String,
  #[serde(default)]
  pub quantity: Option<String>,
  #[serde(default)]
  pub dosage: Option<String>,
  #[serde(default)]
  pub frequency: Option<String>,
  #[serde(default)]
  pub duration: Option<String>,
  #[serde(default)]
  pub instruction: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TestPayload {
  pub test_info_id: Uuid,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreatePrescriptionPayload {
  pub patient_id: Uuid,
  #[serde(default)]
  pub medicines: Vec<MedicinePayload>,
  #[serde(default)]
  pub tests: Vec<TestPayload>,
  #[serde(default)]
  pub extra_information: Option<String>,
}

#[instrument(name = "handler::doctor_dashboard", skip(app_state, auth), fields(account_id = %auth.actor.account_id))]
pub async fn doctor_dashboard_handler(
  app_state: web::Data<AppState>,
  auth: Authorized<DoctorOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let doctor = common_steps::doctor_for(store, &auth.actor).await?;
  let prescriptions = store.prescriptions_by_doctor(doctor.id).await?;
  Ok(view::render(
    "doctor-dashboard",
    Vec::new(),
    json!({ "doctor": doctor, "prescriptions": prescriptions }),
  ))
}

#[instrument(
  name = "handler::create_prescription",
  skip(app_state, payload, auth),
  fields(account_id = %auth.actor.account_id, patient_id = %payload.patient_id)
)]
pub async fn create_prescription_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreatePrescriptionPayload>,
  auth: Authorized<DoctorOnly>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let medicines = payload
    .medicines
    .into_iter()
    .map(|m| NewMedicine {
      medicine_name: m.medicine_name,
      quantity: m.quantity,
      dosage: m.dosage,
      frequency: m.frequency,
      duration: m.duration,
      instruction: m.instruction,
    })
    .collect();
  let tests = payload
    .tests
    .into_iter()
    .map(|t| RequestedTest {
      test_info_id: t.test_info_id,
      description: t.description,
    })
    .collect();

  let ctx_data = ContextData::new(CreatePrescriptionCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth.actor,
    patient_id: payload.patient_id,
    medicines,
    tests,
    extra_information: payload.extra_information,
    doctor: None,
    created: None,
  });

  match app_state.registry.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let prescription = ctx_data
        .snapshot()
        .created
        .ok_or_else(|| AppError::Internal("Prescription pipeline finished without a record.".to_string()))?;
      info!(prescription_id = %prescription.id, "Prescription issued.");
      Ok(view::render(
        "prescription-created",
        vec![Flash::success("Prescription Created")],
        json!({ "prescription": prescription }),
      ))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Prescription creation was halted.".to_string())),
  }
}
