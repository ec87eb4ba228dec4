// apps/hospital_app/src/pipelines/hospital_registration_pipeline.rs

use crate::errors::AppError;
use crate::models::{RegisterStatus, Role};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::HospitalRegistrationCtxData;
use tracing::info;
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

pub const DEFAULT_CERTIFICATE: &str = "doctors_certificate/default.png";

/// A doctor applies to work in a hospital department. The application always
/// lands in `Pending`, even when re-submitted after a decision.
pub fn register_hospital_registration_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<HospitalRegistrationCtxData, AppError>::new(&[
    ("load_doctor_registration", false, None),
    ("check_hospital_registration", false, None),
    ("apply_registration", false, None),
  ]);

  p.on_root("load_doctor_registration", |ctx_data: ContextData<HospitalRegistrationCtxData>| {
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

  p.on_root("check_hospital_registration", |ctx_data: ContextData<HospitalRegistrationCtxData>| {
    Box::pin(async move {
      let (store, hospital_id, department_id, specialization_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.hospital_id,
          guard.department_id,
          guard.specialization_id,
        )
      };

      if store.find_hospital(hospital_id).await?.is_none() {
        return Err(AppError::NotFound("Hospital not found.".to_string()));
      }
      match store.find_department(department_id).await? {
        Some(d) if d.hospital_id == hospital_id => {}
        _ => return Err(AppError::NotFound("Selected department does not exist.".to_string())),
      }
      match store.find_specialization(specialization_id).await? {
        Some(s) if s.hospital_id == hospital_id => {}
        _ => return Err(AppError::NotFound("Selected specialization does not exist.".to_string())),
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("apply_registration", |ctx_data: ContextData<HospitalRegistrationCtxData>| {
    Box::pin(async move {
      let (store, mut doctor) = {
        let guard = ctx_data.read();
        let mut doctor = guard
          .doctor
          .clone()
          .ok_or_else(|| AppError::Internal("Doctor not loaded before registration.".to_string()))?;
        doctor.hospital_id = Some(guard.hospital_id);
        doctor.department_id = Some(guard.department_id);
        doctor.specialization_id = Some(guard.specialization_id);
        doctor.certificate_image = Some(
          guard
            .certificate_image
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CERTIFICATE.to_string()),
        );
        (guard.app_state.store.clone(), doctor)
      };
      doctor.register_status = RegisterStatus::Pending;

      store.update_doctor(&doctor).await?;
      info!(doctor_id = %doctor.id, hospital_id = ?doctor.hospital_id, "Doctor registration submitted.");
      ctx_data.write().doctor = Some(doctor);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}
