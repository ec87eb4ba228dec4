// apps/hospital_app/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Patient,
  Doctor,
  HospitalAdmin,
  LabTechnician,
  Pharmacist,
}

impl Role {
  pub fn label(self) -> &'static str {
    match self {
      Role::Patient => "Patient",
      Role::Doctor => "Doctor",
      Role::HospitalAdmin => "Hospital Admin",
      Role::LabTechnician => "Lab Technician",
      Role::Pharmacist => "Pharmacist",
    }
  }

  /// Where a freshly logged-in account lands.
  pub fn dashboard_path(self) -> &'static str {
    match self {
      Role::Patient => "/patient/dashboard",
      Role::Doctor => "/doctor/dashboard",
      Role::HospitalAdmin => "/hospital-admin/dashboard",
      Role::LabTechnician => "/lab/dashboard",
      Role::Pharmacist => "/pharmacy/dashboard",
    }
  }

  /// Staff roles a hospital admin may create.
  pub fn is_staff(self) -> bool {
    match self {
      Role::HospitalAdmin | Role::LabTechnician | Role::Pharmacist => true,
      Role::Patient | Role::Doctor => false,
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: Role,
  pub login_status: bool,
  pub last_login: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub role: Role,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
  pub token: String,
  pub account_id: Uuid,
  pub role: Role,
  pub created_at: DateTime<Utc>,
}

/// The caller of a workflow, resolved once from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub account_id: Uuid,
  pub role: Role,
}
