// apps/hospital_app/src/pipelines/common_steps.rs

//! Lookups shared by several pipelines and by the read-only handlers.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Actor, Doctor, Patient, Prescription, PrescriptionDetail, Role};
use crate::store::ClinicStore;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Guards a workflow that only `role` may run. The web layer enforces the
/// same policy before a pipeline ever starts.
pub fn require_role(actor: &Actor, role: Role) -> AppResult<()> {
  if actor.role == role {
    return Ok(());
  }
  warn!(account_id = %actor.account_id, actual = actor.role.label(), expected = role.label(), "Workflow refused for role.");
  Err(AppError::Unauthorized(format!("Not a {}", role.label())))
}

pub async fn patient_for(store: &dyn ClinicStore, actor: &Actor) -> AppResult<Patient> {
  store
    .find_patient_by_account(actor.account_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Patient profile not found.".to_string()))
}

pub async fn doctor_for(store: &dyn ClinicStore, actor: &Actor) -> AppResult<Doctor> {
  store
    .find_doctor_by_account(actor.account_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Doctor profile not found.".to_string()))
}

/// The prescription, provided it belongs to the caller's patient profile.
/// A foreign prescription is reported exactly like a missing one.
#[instrument(name = "common_step::owned_prescription", skip(store), err(Display))]
pub async fn owned_prescription(
  store: &dyn ClinicStore,
  actor: &Actor,
  prescription_id: Uuid,
) -> AppResult<Prescription> {
  let patient = patient_for(store, actor).await?;
  match store.find_prescription(prescription_id).await? {
    Some(p) if p.patient_id == patient.id => Ok(p),
    _ => Err(AppError::NotFound(format!("Prescription {} not found.", prescription_id))),
  }
}

pub async fn prescription_detail(store: &dyn ClinicStore, prescription: Prescription) -> AppResult<PrescriptionDetail> {
  let medicines = store.medicines_of(prescription.id).await?;
  let tests = store.tests_of(prescription.id).await?;
  Ok(PrescriptionDetail {
    prescription,
    medicines,
    tests,
  })
}
