// apps/hospital_app/src/web/handlers/hospital_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use wardflow::{ContextData, PipelineResult};

use crate::errors::AppError;
use crate::models::Hospital;
use crate::pipelines::contexts::HospitalRegistrationCtxData;
use crate::state::AppState;
use crate::web::session::{Authorized, DoctorOnly, PatientOrDoctor};
use crate::web::view::{self, Flash};

pub const HOSPITALS_PER_PAGE: usize = 3;

#[derive(Deserialize, Debug, Default)]
pub struct DirectoryQuery {
  #[serde(default)]
  pub search_query: String,
  /// Kept as text so a junk value falls back to the first page.
  pub page: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DoctorRegistrationPayload {
  pub department_id: Uuid,
  pub specialization_id: Uuid,
  #[serde(default)]
  pub certificate_image: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub number: usize,
  pub num_pages: usize,
}

/// Pages are 1-based. A page past the end shows the last page; anything
/// unparsable shows the first.
pub fn paginate<T>(items: Vec<T>, requested: Option<&str>, per_page: usize) -> Page<T> {
  let per_page = per_page.max(1);
  let num_pages = items.len().div_ceil(per_page).max(1);
  let number = requested
    .and_then(|p| p.trim().parse::<usize>().ok())
    .filter(|n| *n >= 1)
    .unwrap_or(1)
    .min(num_pages);
  let items = items
    .into_iter()
    .skip((number - 1) * per_page)
    .take(per_page)
    .collect();
  Page { items, number, num_pages }
}

fn matches_query(hospital: &Hospital, query: &str) -> bool {
  if query.is_empty() {
    return true;
  }
  let query = query.to_lowercase();
  let hit = |field: Option<&str>| field.map(|v| v.to_lowercase().contains(&query)).unwrap_or(false);
  hit(Some(&hospital.name)) || hit(hospital.address.as_deref())
}

#[instrument(name = "handler::list_hospitals", skip(app_state, query, auth), fields(account_id = %auth.actor.account_id))]
pub async fn list_hospitals_handler(
  app_state: web::Data<AppState>,
  query: web::Query<DirectoryQuery>,
  auth: Authorized<PatientOrDoctor>,
) -> Result<HttpResponse, AppError> {
  let search_query = query.search_query.trim().to_string();
  let hospitals: Vec<Hospital> = app_state
    .store
    .list_hospitals()
    .await?
    .into_iter()
    .filter(|h| matches_query(h, &search_query))
    .collect();
  let page = paginate(hospitals, query.page.as_deref(), HOSPITALS_PER_PAGE);

  Ok(view::render(
    "multiple-hospital",
    Vec::new(),
    json!({
      "hospitals": page.items,
      "search_query": search_query,
      "page": page.number,
      "num_pages": page.num_pages,
    }),
  ))
}

async fn load_hospital(app_state: &AppState, hospital_id: Uuid) -> Result<Hospital, AppError> {
  app_state
    .store
    .find_hospital(hospital_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Hospital not found.".to_string()))
}

#[instrument(name = "handler::hospital_profile", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn hospital_profile_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOrDoctor>,
) -> Result<HttpResponse, AppError> {
  let hospital = load_hospital(app_state.get_ref(), path.into_inner()).await?;
  let store = app_state.store.as_ref();
  let departments = store.departments_of(hospital.id).await?;
  let specializations = store.specializations_of(hospital.id).await?;
  let services = store.services_of(hospital.id).await?;

  Ok(view::render(
    "hospital-profile",
    Vec::new(),
    json!({
      "hospitals": hospital,
      "departments": departments,
      "specializations": specializations,
      "services": services,
    }),
  ))
}

#[instrument(name = "handler::hospital_departments", skip(app_state, path, auth), fields(account_id = %auth.actor.account_id))]
pub async fn hospital_departments_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOrDoctor>,
) -> Result<HttpResponse, AppError> {
  let hospital = load_hospital(app_state.get_ref(), path.into_inner()).await?;
  let departments = app_state.store.departments_of(hospital.id).await?;
  Ok(view::render(
    "hospital-department",
    Vec::new(),
    json!({ "hospitals": hospital, "departments": departments }),
  ))
}

#[instrument(name = "handler::department_doctors", skip(app_state, path, query, auth), fields(account_id = %auth.actor.account_id))]
pub async fn department_doctors_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  query: web::Query<DirectoryQuery>,
  auth: Authorized<PatientOrDoctor>,
) -> Result<HttpResponse, AppError> {
  let department_id = path.into_inner();
  let store = app_state.store.as_ref();
  let department = store
    .find_department(department_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Selected department does not exist.".to_string()))?;

  let search_query = query.search_query.trim().to_lowercase();
  let doctors: Vec<_> = store
    .accepted_doctors_in_department(department.id)
    .await?
    .into_iter()
    .filter(|d| {
      search_query.is_empty()
        || d
          .name
          .as_deref()
          .map(|n| n.to_lowercase().contains(&search_query))
          .unwrap_or(false)
    })
    .collect();

  Ok(view::render(
    "hospital-doctor-list",
    Vec::new(),
    json!({
      "department": department,
      "doctors": doctors,
      "search_query": query.search_query.trim(),
      "pk_id": department_id,
    }),
  ))
}

#[instrument(name = "handler::doctor_register_hospital", skip(app_state, path, payload, auth), fields(account_id = %auth.actor.account_id))]
pub async fn doctor_register_hospital_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<DoctorRegistrationPayload>,
  auth: Authorized<DoctorOnly>,
) -> Result<HttpResponse, AppError> {
  let hospital_id = path.into_inner();
  let payload = payload.into_inner();
  let ctx_data = ContextData::new(HospitalRegistrationCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth.actor,
    hospital_id,
    department_id: payload.department_id,
    specialization_id: payload.specialization_id,
    certificate_image: payload.certificate_image,
    doctor: None,
  });

  match app_state.registry.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      info!(%hospital_id, "Doctor registration submitted.");
      Ok(view::redirect(
        "/doctor/dashboard",
        vec![Flash::success("Hospital Registration Request Sent")],
      ))
    }
    PipelineResult::Stopped => {
      warn!(%hospital_id, "Hospital registration pipeline stopped unexpectedly.");
      Err(AppError::Internal("Hospital registration was halted.".to_string()))
    }
  }
}
