// apps/hospital_app/src/models/hospital.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Hospital {
  pub id: Uuid,
  pub name: String,
  pub address: Option<String>,
  pub email: Option<String>,
  pub phone_number: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Department {
  pub id: Uuid,
  pub hospital_id: Uuid,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Specialization {
  pub id: Uuid,
  pub hospital_id: Uuid,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HospitalService {
  pub id: Uuid,
  pub hospital_id: Uuid,
  pub name: String,
}
