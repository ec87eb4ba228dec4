// apps/hospital_app/src/web/handlers/prescription_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Actor, Report};
use crate::pipelines::common_steps;
use crate::services::pdf::{self, PrescriptionDocument};
use crate::state::AppState;
use crate::store::ClinicStore;
use crate::web::handlers::cart_handlers::prescription_view;
use crate::web::session::{Authorized, PatientOnly};
use crate::web::view::{self, Flash};

async fn owned_report(store: &dyn ClinicStore, actor: &Actor, report_id: Uuid) -> Result<Report, AppError> {
  let patient = common_steps::patient_for(store, actor).await?;
  match store.find_report(report_id).await? {
    Some(r) if r.patient_id == patient.id => Ok(r),
    _ => Err(AppError::NotFound(format!("Report {} not found.", report_id))),
  }
}

#[instrument(name = "handler::view_prescription", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn view_prescription_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let prescription = common_steps::owned_prescription(store, &auth.actor, path.into_inner()).await?;
  let detail = common_steps::prescription_detail(store, prescription).await?;
  Ok(prescription_view(&detail, Vec::new()))
}

async fn load_document(
  app_state: &AppState,
  actor: &Actor,
  prescription_id: Uuid,
) -> Result<PrescriptionDocument, AppError> {
  let store = app_state.store.as_ref();
  let patient = common_steps::patient_for(store, actor).await?;
  let prescription = common_steps::owned_prescription(store, actor, prescription_id).await?;
  let doctor = store.find_doctor(prescription.doctor_id).await?;
  let medicines = store.medicines_of(prescription.id).await?;
  let tests = store.tests_of(prescription.id).await?;

  Ok(PrescriptionDocument::build(
    &prescription,
    patient.name.as_deref(),
    doctor.as_ref().and_then(|d| d.name.as_deref()),
    &medicines,
    &tests,
  ))
}

/// Lookup failures keep their own status. Only a rendering failure answers
/// the plain 404.
#[instrument(name = "handler::prescription_pdf", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn prescription_pdf_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let prescription_id = path.into_inner();
  let doc = load_document(app_state.get_ref(), &auth.actor, prescription_id).await?;
  let bytes = pdf::render_prescription_pdf(&doc).map_err(|e| {
    warn!(%prescription_id, error = %e, "Prescription PDF could not be rendered.");
    AppError::Pdf(e.to_string())
  })?;

  info!(%prescription_id, size = bytes.len(), "Prescription PDF rendered.");
  Ok(
    HttpResponse::Ok()
      .content_type("application/pdf")
      .insert_header((header::CONTENT_DISPOSITION, "inline; filename=prescription.pdf"))
      .body(bytes),
  )
}

#[instrument(name = "handler::delete_prescription", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn delete_prescription_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let prescription = common_steps::owned_prescription(store, &auth.actor, path.into_inner()).await?;
  store.delete_prescription(prescription.id).await?;
  info!(prescription_id = %prescription.id, "Prescription deleted.");
  Ok(view::redirect("/patient/dashboard", vec![Flash::info("Prescription Deleted")]))
}

#[instrument(name = "handler::view_report", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn view_report_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let report = owned_report(store, &auth.actor, path.into_inner()).await?;
  let specimens = store.specimens_of(report.id).await?;
  let results = store.results_of(report.id).await?;
  Ok(view::render(
    "report-view",
    Vec::new(),
    json!({ "report": report, "specimen": specimens, "test": results }),
  ))
}

#[instrument(name = "handler::delete_report", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn delete_report_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let report = owned_report(store, &auth.actor, path.into_inner()).await?;
  store.delete_report(report.id).await?;
  info!(report_id = %report.id, "Report deleted.");
  Ok(view::redirect("/patient/dashboard", vec![Flash::info("Report Deleted")]))
}
