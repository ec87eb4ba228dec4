// apps/hospital_app/src/models/clinical.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Lab-test catalog entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TestInformation {
  pub id: Uuid,
  pub hospital_id: Option<Uuid>,
  pub test_name: String,
  pub price_cents: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prescription {
  pub id: Uuid,
  pub patient_id: Uuid,
  pub doctor_id: Uuid,
  pub extra_information: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrescriptionMedicine {
  pub id: Uuid,
  pub prescription_id: Uuid,
  pub medicine_name: String,
  pub quantity: Option<String>,
  pub dosage: Option<String>,
  pub frequency: Option<String>,
  pub duration: Option<String>,
  pub instruction: Option<String>,
}

/// A catalog test attached to a prescription. This is the unit a patient can
/// put in the cart.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PrescriptionTest {
  pub id: Uuid,
  pub prescription_id: Uuid,
  pub test_info_id: Uuid,
  pub test_name: String,
  pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
  pub medicine_name: String,
  pub quantity: Option<String>,
  pub dosage: Option<String>,
  pub frequency: Option<String>,
  pub duration: Option<String>,
  pub instruction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrescriptionTest {
  pub test_info_id: Uuid,
  pub test_name: String,
  pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
  pub patient_id: Uuid,
  pub doctor_id: Uuid,
  pub extra_information: Option<String>,
  pub medicines: Vec<NewMedicine>,
  pub tests: Vec<NewPrescriptionTest>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
  pub id: Uuid,
  pub patient_id: Uuid,
  pub doctor_id: Option<Uuid>,
  pub test_name: String,
  pub description: Option<String>,
  pub delivery_date: Option<NaiveDate>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Specimen {
  pub id: Uuid,
  pub report_id: Uuid,
  pub specimen_type: String,
  pub collection_date: Option<NaiveDate>,
  pub receiving_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TestResult {
  pub id: Uuid,
  pub report_id: Uuid,
  pub test_name: String,
  pub result: Option<String>,
  pub unit: Option<String>,
  pub referred_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
  Pending,
  Confirmed,
  Cancelled,
  Completed,
}

impl AppointmentStatus {
  /// Appointments still shown on the patient dashboard.
  pub fn is_active(self) -> bool {
    matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
  pub id: Uuid,
  pub patient_id: Uuid,
  pub doctor_id: Uuid,
  pub date: NaiveDate,
  pub time: Option<String>,
  pub status: AppointmentStatus,
}

/// A prescription with its lines, as shown on the prescription view.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDetail {
  pub prescription: Prescription,
  pub medicines: Vec<PrescriptionMedicine>,
  pub tests: Vec<PrescriptionTest>,
}
