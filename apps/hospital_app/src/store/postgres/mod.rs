// apps/hospital_app/src/store/postgres/mod.rs

//! Postgres-backed store. Queries are runtime-checked (`query_as` + `bind`)
//! so the crate builds without a live database. Uniqueness of open cart lines
//! and open orders is enforced by partial unique indexes in `schema.sql`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{AccountStore, CartStore, ClinicalStore, DirectoryStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Account, Appointment, CartEntry, CartLine, Department, Doctor, Hospital, HospitalService, NewAccount,
  NewPrescription, Patient, Prescription, PrescriptionMedicine, PrescriptionTest, Report, Role, Session,
  Specialization, Specimen, TestInformation, TestOrder, TestResult,
};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, role, login_status, last_login, created_at";
const PATIENT_COLUMNS: &str =
  "id, account_id, name, dob, age, blood_group, phone_number, address, weight_kg, nid, history, featured_image";
const DOCTOR_COLUMNS: &str =
  "id, account_id, name, hospital_id, department_id, specialization_id, register_status, certificate_image, created_at";
const CART_LINE_COLUMNS: &str = "id, item_id, user_id, purchased, created_at";
const ORDER_COLUMNS: &str = "id, user_id, ordered, ordered_at, payment_reference, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(database_url)
      .await?;
    info!("Database connection pool established.");
    Ok(Self { pool })
  }

  /// Applies `schema.sql`. Every statement in it is idempotent.
  #[instrument(name = "PgStore::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> Result<()> {
    sqlx::raw_sql(include_str!("schema.sql")).execute(&self.pool).await?;
    info!("Database schema is up to date.");
    Ok(())
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  match err {
    sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
    _ => false,
  }
}

#[async_trait]
impl AccountStore for PgStore {
  async fn insert_account(&self, new_account: NewAccount) -> Result<Account> {
    let sql = format!(
      "INSERT INTO accounts (id, username, email, password_hash, role) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, Account>(&sql)
      .bind(Uuid::new_v4())
      .bind(&new_account.username)
      .bind(&new_account.email)
      .bind(&new_account.password_hash)
      .bind(new_account.role)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          AppError::Validation("Username already exists. Please choose a different one.".to_string())
        } else {
          AppError::Sqlx(e)
        }
      })
  }

  async fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
    Ok(sqlx::query_as::<_, Account>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE username = $1", ACCOUNT_COLUMNS);
    Ok(sqlx::query_as::<_, Account>(&sql).bind(username).fetch_optional(&self.pool).await?)
  }

  async fn username_taken(&self, username: &str) -> Result<bool> {
    Ok(
      sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE LOWER(username) = LOWER($1))")
        .bind(username)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn find_accounts_by_email(&self, email: &str) -> Result<Vec<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE LOWER(email) = LOWER($1)", ACCOUNT_COLUMNS);
    Ok(sqlx::query_as::<_, Account>(&sql).bind(email).fetch_all(&self.pool).await?)
  }

  async fn update_password_hash(&self, account_id: Uuid, password_hash: &str) -> Result<()> {
    let done = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
      .bind(account_id)
      .bind(password_hash)
      .execute(&self.pool)
      .await?;
    if done.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Account {} not found.", account_id)));
    }
    Ok(())
  }

  async fn set_login_status(&self, account_id: Uuid, online: bool) -> Result<()> {
    sqlx::query(
      "UPDATE accounts SET login_status = $2, last_login = CASE WHEN $2 THEN NOW() ELSE last_login END WHERE id = $1",
    )
    .bind(account_id)
    .bind(online)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn create_session(&self, account_id: Uuid, role: Role, token: &str) -> Result<Session> {
    Ok(
      sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (token, account_id, role) VALUES ($1, $2, $3) RETURNING token, account_id, role, created_at",
      )
      .bind(token)
      .bind(account_id)
      .bind(role)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>> {
    Ok(
      sqlx::query_as::<_, Session>("SELECT token, account_id, role, created_at FROM sessions WHERE token = $1")
        .bind(token)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn delete_session(&self, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1").bind(token).execute(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl DirectoryStore for PgStore {
  async fn insert_patient(&self, account_id: Uuid, name: Option<String>) -> Result<Patient> {
    let sql = format!(
      "INSERT INTO patients (id, account_id, name) VALUES ($1, $2, $3) RETURNING {}",
      PATIENT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Patient>(&sql)
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
    let sql = format!("SELECT {} FROM patients WHERE id = $1", PATIENT_COLUMNS);
    Ok(sqlx::query_as::<_, Patient>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<Patient>> {
    let sql = format!("SELECT {} FROM patients WHERE account_id = $1", PATIENT_COLUMNS);
    Ok(sqlx::query_as::<_, Patient>(&sql).bind(account_id).fetch_optional(&self.pool).await?)
  }

  async fn update_patient(&self, patient: &Patient) -> Result<()> {
    let done = sqlx::query(
      "UPDATE patients SET name = $2, dob = $3, age = $4, blood_group = $5, phone_number = $6, address = $7, \
       weight_kg = $8, nid = $9, history = $10, featured_image = $11 WHERE id = $1",
    )
    .bind(patient.id)
    .bind(&patient.name)
    .bind(patient.dob)
    .bind(patient.age)
    .bind(&patient.blood_group)
    .bind(&patient.phone_number)
    .bind(&patient.address)
    .bind(patient.weight_kg)
    .bind(&patient.nid)
    .bind(&patient.history)
    .bind(&patient.featured_image)
    .execute(&self.pool)
    .await?;
    if done.rows_affected() == 0 {
      return Err(AppError::NotFound("Patient profile not found.".to_string()));
    }
    Ok(())
  }

  async fn insert_doctor(&self, account_id: Uuid, name: Option<String>) -> Result<Doctor> {
    let sql = format!(
      "INSERT INTO doctors (id, account_id, name) VALUES ($1, $2, $3) RETURNING {}",
      DOCTOR_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Doctor>(&sql)
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
    let sql = format!("SELECT {} FROM doctors WHERE id = $1", DOCTOR_COLUMNS);
    Ok(sqlx::query_as::<_, Doctor>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>> {
    let sql = format!("SELECT {} FROM doctors WHERE account_id = $1", DOCTOR_COLUMNS);
    Ok(sqlx::query_as::<_, Doctor>(&sql).bind(account_id).fetch_optional(&self.pool).await?)
  }

  async fn update_doctor(&self, doctor: &Doctor) -> Result<()> {
    let done = sqlx::query(
      "UPDATE doctors SET name = $2, hospital_id = $3, department_id = $4, specialization_id = $5, \
       register_status = $6, certificate_image = $7 WHERE id = $1",
    )
    .bind(doctor.id)
    .bind(&doctor.name)
    .bind(doctor.hospital_id)
    .bind(doctor.department_id)
    .bind(doctor.specialization_id)
    .bind(doctor.register_status)
    .bind(&doctor.certificate_image)
    .execute(&self.pool)
    .await?;
    if done.rows_affected() == 0 {
      return Err(AppError::NotFound("Doctor profile not found.".to_string()));
    }
    Ok(())
  }

  async fn accepted_doctors_in_department(&self, department_id: Uuid) -> Result<Vec<Doctor>> {
    let sql = format!(
      "SELECT {} FROM doctors WHERE department_id = $1 AND register_status = 'accepted' ORDER BY created_at",
      DOCTOR_COLUMNS
    );
    Ok(sqlx::query_as::<_, Doctor>(&sql).bind(department_id).fetch_all(&self.pool).await?)
  }

  async fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital> {
    Ok(
      sqlx::query_as::<_, Hospital>(
        "INSERT INTO hospitals (id, name, address, email, phone_number, description) VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, name, address, email, phone_number, description",
      )
      .bind(hospital.id)
      .bind(&hospital.name)
      .bind(&hospital.address)
      .bind(&hospital.email)
      .bind(&hospital.phone_number)
      .bind(&hospital.description)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn list_hospitals(&self) -> Result<Vec<Hospital>> {
    Ok(
      sqlx::query_as::<_, Hospital>("SELECT id, name, address, email, phone_number, description FROM hospitals ORDER BY name")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn find_hospital(&self, id: Uuid) -> Result<Option<Hospital>> {
    Ok(
      sqlx::query_as::<_, Hospital>(
        "SELECT id, name, address, email, phone_number, description FROM hospitals WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn insert_department(&self, hospital_id: Uuid, name: &str) -> Result<Department> {
    Ok(
      sqlx::query_as::<_, Department>(
        "INSERT INTO departments (id, hospital_id, name) VALUES ($1, $2, $3) RETURNING id, hospital_id, name",
      )
      .bind(Uuid::new_v4())
      .bind(hospital_id)
      .bind(name)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn find_department(&self, id: Uuid) -> Result<Option<Department>> {
    Ok(
      sqlx::query_as::<_, Department>("SELECT id, hospital_id, name FROM departments WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn departments_of(&self, hospital_id: Uuid) -> Result<Vec<Department>> {
    Ok(
      sqlx::query_as::<_, Department>("SELECT id, hospital_id, name FROM departments WHERE hospital_id = $1 ORDER BY name")
        .bind(hospital_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn insert_specialization(&self, hospital_id: Uuid, name: &str) -> Result<Specialization> {
    Ok(
      sqlx::query_as::<_, Specialization>(
        "INSERT INTO specializations (id, hospital_id, name) VALUES ($1, $2, $3) RETURNING id, hospital_id, name",
      )
      .bind(Uuid::new_v4())
      .bind(hospital_id)
      .bind(name)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn find_specialization(&self, id: Uuid) -> Result<Option<Specialization>> {
    Ok(
      sqlx::query_as::<_, Specialization>("SELECT id, hospital_id, name FROM specializations WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn specializations_of(&self, hospital_id: Uuid) -> Result<Vec<Specialization>> {
    Ok(
      sqlx::query_as::<_, Specialization>(
        "SELECT id, hospital_id, name FROM specializations WHERE hospital_id = $1 ORDER BY name",
      )
      .bind(hospital_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn insert_service(&self, hospital_id: Uuid, name: &str) -> Result<HospitalService> {
    Ok(
      sqlx::query_as::<_, HospitalService>(
        "INSERT INTO hospital_services (id, hospital_id, name) VALUES ($1, $2, $3) RETURNING id, hospital_id, name",
      )
      .bind(Uuid::new_v4())
      .bind(hospital_id)
      .bind(name)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn services_of(&self, hospital_id: Uuid) -> Result<Vec<HospitalService>> {
    Ok(
      sqlx::query_as::<_, HospitalService>(
        "SELECT id, hospital_id, name FROM hospital_services WHERE hospital_id = $1 ORDER BY name",
      )
      .bind(hospital_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }
}

#[async_trait]
impl ClinicalStore for PgStore {
  async fn insert_test_information(&self, test: TestInformation) -> Result<TestInformation> {
    Ok(
      sqlx::query_as::<_, TestInformation>(
        "INSERT INTO test_information (id, hospital_id, test_name, price_cents) VALUES ($1, $2, $3, $4) \
         RETURNING id, hospital_id, test_name, price_cents",
      )
      .bind(test.id)
      .bind(test.hospital_id)
      .bind(&test.test_name)
      .bind(test.price_cents)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn find_test_information(&self, id: Uuid) -> Result<Option<TestInformation>> {
    Ok(
      sqlx::query_as::<_, TestInformation>(
        "SELECT id, hospital_id, test_name, price_cents FROM test_information WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgStore::insert_prescription", skip_all, fields(patient_id = %new_prescription.patient_id))]
  async fn insert_prescription(&self, new_prescription: NewPrescription) -> Result<Prescription> {
    let mut tx = self.pool.begin().await?;

    let prescription = sqlx::query_as::<_, Prescription>(
      "INSERT INTO prescriptions (id, patient_id, doctor_id, extra_information) VALUES ($1, $2, $3, $4) \
       RETURNING id, patient_id, doctor_id, extra_information, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(new_prescription.patient_id)
    .bind(new_prescription.doctor_id)
    .bind(&new_prescription.extra_information)
    .fetch_one(&mut *tx)
    .await?;

    for m in &new_prescription.medicines {
      sqlx::query(
        "INSERT INTO prescription_medicines \
         (id, prescription_id, medicine_name, quantity, dosage, frequency, duration, instruction) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
      )
      .bind(Uuid::new_v4())
      .bind(prescription.id)
      .bind(&m.medicine_name)
      .bind(&m.quantity)
      .bind(&m.dosage)
      .bind(&m.frequency)
      .bind(&m.duration)
      .bind(&m.instruction)
      .execute(&mut *tx)
      .await?;
    }

    for test in &new_prescription.tests {
      sqlx::query(
        "INSERT INTO prescription_tests (id, prescription_id, test_info_id, test_name, description) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(Uuid::new_v4())
      .bind(prescription.id)
      .bind(test.test_info_id)
      .bind(&test.test_name)
      .bind(&test.description)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(prescription)
  }

  async fn find_prescription(&self, id: Uuid) -> Result<Option<Prescription>> {
    Ok(
      sqlx::query_as::<_, Prescription>(
        "SELECT id, patient_id, doctor_id, extra_information, created_at FROM prescriptions WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn prescriptions_for_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>> {
    Ok(
      sqlx::query_as::<_, Prescription>(
        "SELECT id, patient_id, doctor_id, extra_information, created_at FROM prescriptions \
         WHERE patient_id = $1 ORDER BY created_at DESC",
      )
      .bind(patient_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn prescriptions_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Prescription>> {
    Ok(
      sqlx::query_as::<_, Prescription>(
        "SELECT id, patient_id, doctor_id, extra_information, created_at FROM prescriptions \
         WHERE doctor_id = $1 ORDER BY created_at DESC",
      )
      .bind(doctor_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn medicines_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionMedicine>> {
    Ok(
      sqlx::query_as::<_, PrescriptionMedicine>(
        "SELECT id, prescription_id, medicine_name, quantity, dosage, frequency, duration, instruction \
         FROM prescription_medicines WHERE prescription_id = $1",
      )
      .bind(prescription_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn tests_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionTest>> {
    Ok(
      sqlx::query_as::<_, PrescriptionTest>(
        "SELECT id, prescription_id, test_info_id, test_name, description FROM prescription_tests \
         WHERE prescription_id = $1",
      )
      .bind(prescription_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_prescription_test(&self, id: Uuid) -> Result<Option<PrescriptionTest>> {
    Ok(
      sqlx::query_as::<_, PrescriptionTest>(
        "SELECT id, prescription_id, test_info_id, test_name, description FROM prescription_tests WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_prescription_test_for(
    &self,
    prescription_id: Uuid,
    test_info_id: Uuid,
  ) -> Result<Option<PrescriptionTest>> {
    Ok(
      sqlx::query_as::<_, PrescriptionTest>(
        "SELECT id, prescription_id, test_info_id, test_name, description FROM prescription_tests \
         WHERE prescription_id = $1 AND test_info_id = $2 LIMIT 1",
      )
      .bind(prescription_id)
      .bind(test_info_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn delete_prescription(&self, id: Uuid) -> Result<bool> {
    // Foreign keys cascade to medicines, tests, cart lines and order items.
    let done = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  async fn insert_report(&self, report: Report, specimens: Vec<Specimen>, results: Vec<TestResult>) -> Result<Report> {
    let mut tx = self.pool.begin().await?;

    let saved = sqlx::query_as::<_, Report>(
      "INSERT INTO reports (id, patient_id, doctor_id, test_name, description, delivery_date, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) \
       RETURNING id, patient_id, doctor_id, test_name, description, delivery_date, created_at",
    )
    .bind(report.id)
    .bind(report.patient_id)
    .bind(report.doctor_id)
    .bind(&report.test_name)
    .bind(&report.description)
    .bind(report.delivery_date)
    .bind(report.created_at)
    .fetch_one(&mut *tx)
    .await?;

    for s in &specimens {
      sqlx::query(
        "INSERT INTO specimens (id, report_id, specimen_type, collection_date, receiving_date) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(s.id)
      .bind(saved.id)
      .bind(&s.specimen_type)
      .bind(s.collection_date)
      .bind(s.receiving_date)
      .execute(&mut *tx)
      .await?;
    }

    for r in &results {
      sqlx::query(
        "INSERT INTO test_results (id, report_id, test_name, result, unit, referred_value) \
         VALUES ($1, $2, $3, $4, $5, $6)",
      )
      .bind(r.id)
      .bind(saved.id)
      .bind(&r.test_name)
      .bind(&r.result)
      .bind(&r.unit)
      .bind(&r.referred_value)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(saved)
  }

  async fn reports_for_patient(&self, patient_id: Uuid) -> Result<Vec<Report>> {
    Ok(
      sqlx::query_as::<_, Report>(
        "SELECT id, patient_id, doctor_id, test_name, description, delivery_date, created_at FROM reports \
         WHERE patient_id = $1 ORDER BY created_at",
      )
      .bind(patient_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
    Ok(
      sqlx::query_as::<_, Report>(
        "SELECT id, patient_id, doctor_id, test_name, description, delivery_date, created_at FROM reports WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn specimens_of(&self, report_id: Uuid) -> Result<Vec<Specimen>> {
    Ok(
      sqlx::query_as::<_, Specimen>(
        "SELECT id, report_id, specimen_type, collection_date, receiving_date FROM specimens WHERE report_id = $1",
      )
      .bind(report_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn results_of(&self, report_id: Uuid) -> Result<Vec<TestResult>> {
    Ok(
      sqlx::query_as::<_, TestResult>(
        "SELECT id, report_id, test_name, result, unit, referred_value FROM test_results WHERE report_id = $1",
      )
      .bind(report_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn delete_report(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM reports WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(done.rows_affected() > 0)
  }

  async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment> {
    Ok(
      sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, time, status) VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, patient_id, doctor_id, date, time, status",
      )
      .bind(appointment.id)
      .bind(appointment.patient_id)
      .bind(appointment.doctor_id)
      .bind(appointment.date)
      .bind(&appointment.time)
      .bind(appointment.status)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn active_appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
    Ok(
      sqlx::query_as::<_, Appointment>(
        "SELECT id, patient_id, doctor_id, date, time, status FROM appointments \
         WHERE patient_id = $1 AND status IN ('pending', 'confirmed') ORDER BY date",
      )
      .bind(patient_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn get_or_create_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<(CartLine, bool)> {
    let insert = format!(
      "INSERT INTO cart_lines (id, item_id, user_id) VALUES ($1, $2, $3) \
       ON CONFLICT (item_id, user_id) WHERE NOT purchased DO NOTHING RETURNING {}",
      CART_LINE_COLUMNS
    );
    let created = sqlx::query_as::<_, CartLine>(&insert)
      .bind(Uuid::new_v4())
      .bind(item_id)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    if let Some(line) = created {
      return Ok((line, true));
    }
    match self.find_open_cart_line(item_id, user_id).await? {
      Some(line) => Ok((line, false)),
      None => Err(AppError::Internal(format!(
        "Cart line for item {} vanished during get-or-create.",
        item_id
      ))),
    }
  }

  async fn find_open_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<Option<CartLine>> {
    let sql = format!(
      "SELECT {} FROM cart_lines WHERE item_id = $1 AND user_id = $2 AND NOT purchased",
      CART_LINE_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, CartLine>(&sql)
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn unpurchased_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
    let sql = format!(
      "SELECT {} FROM cart_lines WHERE user_id = $1 AND NOT purchased ORDER BY created_at",
      CART_LINE_COLUMNS
    );
    Ok(sqlx::query_as::<_, CartLine>(&sql).bind(user_id).fetch_all(&self.pool).await?)
  }

  async fn get_or_create_open_order(&self, user_id: Uuid) -> Result<(TestOrder, bool)> {
    let insert = format!(
      "INSERT INTO test_orders (id, user_id) VALUES ($1, $2) \
       ON CONFLICT (user_id) WHERE NOT ordered DO NOTHING RETURNING {}",
      ORDER_COLUMNS
    );
    let created = sqlx::query_as::<_, TestOrder>(&insert)
      .bind(Uuid::new_v4())
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    if let Some(order) = created {
      return Ok((order, true));
    }
    match self.find_open_order(user_id).await? {
      Some(order) => Ok((order, false)),
      None => Err(AppError::Internal(format!(
        "Open order for user {} vanished during get-or-create.",
        user_id
      ))),
    }
  }

  async fn find_open_order(&self, user_id: Uuid) -> Result<Option<TestOrder>> {
    let sql = format!("SELECT {} FROM test_orders WHERE user_id = $1 AND NOT ordered", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, TestOrder>(&sql).bind(user_id).fetch_optional(&self.pool).await?)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<TestOrder>> {
    let sql = format!("SELECT {} FROM test_orders WHERE user_id = $1 ORDER BY created_at", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, TestOrder>(&sql).bind(user_id).fetch_all(&self.pool).await?)
  }

  async fn attach_line(&self, order_id: Uuid, line_id: Uuid) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    // The share lock holds off a concurrent finalize_order until this membership commits.
    let ordered = sqlx::query_scalar::<_, bool>("SELECT ordered FROM test_orders WHERE id = $1 FOR SHARE")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?;
    if ordered != Some(false) {
      return Err(AppError::Internal(format!("Order {} is not open.", order_id)));
    }
    let done = sqlx::query(
      "INSERT INTO test_order_items (order_id, line_id) VALUES ($1, $2) ON CONFLICT (order_id, line_id) DO NOTHING",
    )
    .bind(order_id)
    .bind(line_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| match &e {
      sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
        AppError::NotFound(format!("Cart line {} not found.", line_id))
      }
      _ => AppError::Sqlx(e),
    })?;
    tx.commit().await?;
    Ok(done.rows_affected() > 0)
  }

  async fn order_line_ids(&self, order_id: Uuid) -> Result<Vec<Uuid>> {
    Ok(
      sqlx::query_scalar::<_, Uuid>("SELECT line_id FROM test_order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn remove_line(&self, order_id: Uuid, line_id: Uuid) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query("DELETE FROM test_order_items WHERE order_id = $1 AND line_id = $2")
      .bind(order_id)
      .bind(line_id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM cart_lines WHERE id = $1")
      .bind(line_id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(())
  }

  async fn cart_entries(&self, order_id: Uuid) -> Result<Vec<CartEntry>> {
    Ok(
      sqlx::query_as::<_, CartEntry>(
        "SELECT cl.id AS line_id, pt.id AS item_id, pt.prescription_id, pt.test_name, \
                COALESCE(ti.price_cents, 0) AS price_cents \
         FROM test_order_items toi \
         JOIN cart_lines cl ON cl.id = toi.line_id \
         JOIN prescription_tests pt ON pt.id = cl.item_id \
         LEFT JOIN test_information ti ON ti.id = pt.test_info_id \
         WHERE toi.order_id = $1 \
         ORDER BY cl.created_at",
      )
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgStore::finalize_order", skip(self, payment_reference), err(Display))]
  async fn finalize_order(&self, order_id: Uuid, payment_reference: &str) -> Result<TestOrder> {
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "UPDATE test_orders SET ordered = TRUE, ordered_at = NOW(), payment_reference = $2 \
       WHERE id = $1 AND NOT ordered RETURNING {}",
      ORDER_COLUMNS
    );
    let order = sqlx::query_as::<_, TestOrder>(&sql)
      .bind(order_id)
      .bind(payment_reference)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| AppError::NotFound("You don't have an active order".to_string()))?;
    sqlx::query(
      "UPDATE cart_lines SET purchased = TRUE WHERE id IN (SELECT line_id FROM test_order_items WHERE order_id = $1)",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(order)
  }
}
