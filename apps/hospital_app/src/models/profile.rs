// apps/hospital_app/src/models/profile.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Patient {
  pub id: Uuid,
  pub account_id: Uuid,
  pub name: Option<String>,
  pub dob: Option<NaiveDate>,
  pub age: Option<i32>,
  pub blood_group: Option<String>,
  pub phone_number: Option<String>,
  pub address: Option<String>,
  pub weight_kg: Option<i32>,
  pub nid: Option<String>,
  pub history: Option<String>,
  pub featured_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "register_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
  Pending,
  Accepted,
  Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Doctor {
  pub id: Uuid,
  pub account_id: Uuid,
  pub name: Option<String>,
  pub hospital_id: Option<Uuid>,
  pub department_id: Option<Uuid>,
  pub specialization_id: Option<Uuid>,
  pub register_status: RegisterStatus,
  pub certificate_image: Option<String>,
  pub created_at: DateTime<Utc>,
}
