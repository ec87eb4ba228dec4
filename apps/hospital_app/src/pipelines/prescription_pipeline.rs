// apps/hospital_app/src/pipelines/prescription_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewPrescription, NewPrescriptionTest, Role};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CreatePrescriptionCtxData;
use tracing::{info, warn};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

/// A doctor writes a prescription. Test lines snapshot the catalog name so the
/// prescription reads the same after the catalog changes.
pub fn register_prescription_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<CreatePrescriptionCtxData, AppError>::new(&[
    ("load_prescribing_doctor", false, None),
    ("validate_prescription_lines", false, None),
    ("store_prescription", false, None),
  ]);

  p.on_root("load_prescribing_doctor", |ctx_data: ContextData<CreatePrescriptionCtxData>| {
    Box::pin(async move {
      let (store, actor) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor)
      };
      common_steps::require_role(&actor, Role::Doctor)?;
      let doctor = common_steps::doctor_for(store.as_ref(), &actor).await?;
      ctx_data.write().doctor = Some(doctor);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("validate_prescription_lines", |ctx_data: ContextData<CreatePrescriptionCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.medicines.iter().any(|m| m.medicine_name.trim().is_empty()) {
        warn!("Prescription submitted with an unnamed medicine.");
        return Err(AppError::Validation("Every medicine needs a name.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("store_prescription", |ctx_data: ContextData<CreatePrescriptionCtxData>| {
    Box::pin(async move {
      let (store, doctor_id, patient_id, medicines, requested, extra_information) = {
        let guard = ctx_data.read();
        let doctor_id = guard
          .doctor
          .as_ref()
          .map(|d| d.id)
          .ok_or_else(|| AppError::Internal("Doctor not loaded before prescription insert.".to_string()))?;
        (
          guard.app_state.store.clone(),
          doctor_id,
          guard.patient_id,
          guard.medicines.clone(),
          guard.tests.clone(),
          guard.extra_information.clone(),
        )
      };

      if store.find_patient(patient_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Patient {} not found.", patient_id)));
      }
      let mut tests = Vec::with_capacity(requested.len());
      for t in requested {
        let info = store
          .find_test_information(t.test_info_id)
          .await?
          .ok_or_else(|| AppError::NotFound(format!("Test {} not found.", t.test_info_id)))?;
        tests.push(NewPrescriptionTest {
          test_info_id: info.id,
          test_name: info.test_name,
          description: t.description,
        });
      }

      let prescription = store
        .insert_prescription(NewPrescription {
          patient_id,
          doctor_id,
          extra_information,
          medicines,
          tests,
        })
        .await?;
      info!(prescription_id = %prescription.id, %patient_id, %doctor_id, "Prescription created.");
      ctx_data.write().created = Some(prescription);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}
