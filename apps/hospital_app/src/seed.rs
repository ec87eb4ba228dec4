// apps/hospital_app/src/seed.rs

//! Demo data for local runs (`SEED_DB=true`).

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
  Appointment, AppointmentStatus, Hospital, NewAccount, NewMedicine, NewPrescription, NewPrescriptionTest,
  RegisterStatus, Role, TestInformation,
};
use crate::services::auth_service;
use crate::store::ClinicStore;

pub const DEMO_PASSWORD: &str = "demo-pass-123";

#[instrument(name = "seed::seed_demo_data", skip_all)]
pub async fn seed_demo_data(store: &dyn ClinicStore) -> Result<()> {
  if store.username_taken("demo_patient").await? {
    info!("Demo data already present; skipping seed.");
    return Ok(());
  }

  let hospital = store
    .insert_hospital(Hospital {
      id: Uuid::new_v4(),
      name: "Green Valley General".to_string(),
      address: Some("12 Lake Road, Dhaka".to_string()),
      email: Some("info@greenvalley.example".to_string()),
      phone_number: Some("+880-2-555-0100".to_string()),
      description: Some("General hospital with an on-site laboratory.".to_string()),
    })
    .await?;
  let department = store.insert_department(hospital.id, "Cardiology").await?;
  let specialization = store.insert_specialization(hospital.id, "Cardiologist").await?;
  store.insert_service(hospital.id, "Pathology Lab").await?;

  let mut catalog = Vec::new();
  for (name, price_cents) in [("Complete Blood Count", 50_000), ("Lipid Profile", 120_000), ("ECG", 80_000)] {
    catalog.push(
      store
        .insert_test_information(TestInformation {
          id: Uuid::new_v4(),
          hospital_id: Some(hospital.id),
          test_name: name.to_string(),
          price_cents,
        })
        .await?,
    );
  }

  let password_hash = auth_service::hash_password(DEMO_PASSWORD)?;
  let doctor_account = store
    .insert_account(NewAccount {
      username: "demo_doctor".to_string(),
      email: "doctor@example.com".to_string(),
      password_hash: password_hash.clone(),
      role: Role::Doctor,
    })
    .await?;
  let mut doctor = store
    .insert_doctor(doctor_account.id, Some("Dr. Rahim Uddin".to_string()))
    .await?;
  doctor.hospital_id = Some(hospital.id);
  doctor.department_id = Some(department.id);
  doctor.specialization_id = Some(specialization.id);
  doctor.register_status = RegisterStatus::Accepted;
  store.update_doctor(&doctor).await?;

  let patient_account = store
    .insert_account(NewAccount {
      username: "demo_patient".to_string(),
      email: "patient@example.com".to_string(),
      password_hash,
      role: Role::Patient,
    })
    .await?;
  let patient = store
    .insert_patient(patient_account.id, Some("Karim Hasan".to_string()))
    .await?;

  let prescription = store
    .insert_prescription(NewPrescription {
      patient_id: patient.id,
      doctor_id: doctor.id,
      extra_information: Some("Fasting required before the lipid profile.".to_string()),
      medicines: vec![NewMedicine {
        medicine_name: "Napa".to_string(),
        quantity: Some("10".to_string()),
        dosage: Some("500mg".to_string()),
        frequency: Some("1-0-1".to_string()),
        duration: Some("5 days".to_string()),
        instruction: Some("after meal".to_string()),
      }],
      tests: catalog
        .iter()
        .take(2)
        .map(|t| NewPrescriptionTest {
          test_info_id: t.id,
          test_name: t.test_name.clone(),
          description: None,
        })
        .collect(),
    })
    .await?;

  store
    .insert_appointment(Appointment {
      id: Uuid::new_v4(),
      patient_id: patient.id,
      doctor_id: doctor.id,
      date: Utc::now().date_naive(),
      time: Some("10:30".to_string()),
      status: AppointmentStatus::Confirmed,
    })
    .await?;

  info!(hospital_id = %hospital.id, prescription_id = %prescription.id, "Demo data seeded.");
  Ok(())
}
