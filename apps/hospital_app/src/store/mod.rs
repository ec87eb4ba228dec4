// apps/hospital_app/src/store/mod.rs

//! Persistence seams. Pipelines and handlers only see these traits; `memory`
//! backs tests and database-less runs, `postgres` backs production.
//!
//! Every get-or-create method is atomic: two concurrent callers observe the
//! same row, and no duplicate is ever persisted.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
  Account, Appointment, CartEntry, CartLine, Department, Doctor, Hospital, HospitalService, NewAccount,
  NewPrescription, Patient, Prescription, PrescriptionMedicine, PrescriptionTest, Report, Role, Session,
  Specialization, Specimen, TestInformation, TestOrder, TestResult,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AccountStore: Send + Sync {
  async fn insert_account(&self, new_account: NewAccount) -> Result<Account>;
  async fn find_account(&self, id: Uuid) -> Result<Option<Account>>;
  async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>>;
  /// Case-insensitive existence check.
  async fn username_taken(&self, username: &str) -> Result<bool>;
  async fn find_accounts_by_email(&self, email: &str) -> Result<Vec<Account>>;
  async fn update_password_hash(&self, account_id: Uuid, password_hash: &str) -> Result<()>;
  /// Also stamps `last_login` when going online.
  async fn set_login_status(&self, account_id: Uuid, online: bool) -> Result<()>;

  async fn create_session(&self, account_id: Uuid, role: Role, token: &str) -> Result<Session>;
  async fn find_session(&self, token: &str) -> Result<Option<Session>>;
  async fn delete_session(&self, token: &str) -> Result<()>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
  async fn insert_patient(&self, account_id: Uuid, name: Option<String>) -> Result<Patient>;
  async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>>;
  async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<Patient>>;
  async fn update_patient(&self, patient: &Patient) -> Result<()>;

  async fn insert_doctor(&self, account_id: Uuid, name: Option<String>) -> Result<Doctor>;
  async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;
  async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>>;
  async fn update_doctor(&self, doctor: &Doctor) -> Result<()>;
  async fn accepted_doctors_in_department(&self, department_id: Uuid) -> Result<Vec<Doctor>>;

  async fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital>;
  async fn list_hospitals(&self) -> Result<Vec<Hospital>>;
  async fn find_hospital(&self, id: Uuid) -> Result<Option<Hospital>>;

  async fn insert_department(&self, hospital_id: Uuid, name: &str) -> Result<Department>;
  async fn find_department(&self, id: Uuid) -> Result<Option<Department>>;
  async fn departments_of(&self, hospital_id: Uuid) -> Result<Vec<Department>>;
  async fn insert_specialization(&self, hospital_id: Uuid, name: &str) -> Result<Specialization>;
  async fn find_specialization(&self, id: Uuid) -> Result<Option<Specialization>>;
  async fn specializations_of(&self, hospital_id: Uuid) -> Result<Vec<Specialization>>;
  async fn insert_service(&self, hospital_id: Uuid, name: &str) -> Result<HospitalService>;
  async fn services_of(&self, hospital_id: Uuid) -> Result<Vec<HospitalService>>;
}

#[async_trait]
pub trait ClinicalStore: Send + Sync {
  async fn insert_test_information(&self, test: TestInformation) -> Result<TestInformation>;
  async fn find_test_information(&self, id: Uuid) -> Result<Option<TestInformation>>;

  /// Inserts the prescription with all of its medicine and test lines at once.
  async fn insert_prescription(&self, new_prescription: NewPrescription) -> Result<Prescription>;
  async fn find_prescription(&self, id: Uuid) -> Result<Option<Prescription>>;
  /// Newest first.
  async fn prescriptions_for_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>>;
  async fn prescriptions_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Prescription>>;
  async fn medicines_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionMedicine>>;
  async fn tests_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionTest>>;
  async fn find_prescription_test(&self, id: Uuid) -> Result<Option<PrescriptionTest>>;
  async fn find_prescription_test_for(&self, prescription_id: Uuid, test_info_id: Uuid)
    -> Result<Option<PrescriptionTest>>;
  /// Cascades to medicine lines, test lines and any cart lines for those tests.
  async fn delete_prescription(&self, id: Uuid) -> Result<bool>;

  async fn insert_report(&self, report: Report, specimens: Vec<Specimen>, results: Vec<TestResult>) -> Result<Report>;
  async fn reports_for_patient(&self, patient_id: Uuid) -> Result<Vec<Report>>;
  async fn find_report(&self, id: Uuid) -> Result<Option<Report>>;
  async fn specimens_of(&self, report_id: Uuid) -> Result<Vec<Specimen>>;
  async fn results_of(&self, report_id: Uuid) -> Result<Vec<TestResult>>;
  async fn delete_report(&self, id: Uuid) -> Result<bool>;

  async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment>;
  /// Pending and confirmed appointments only.
  async fn active_appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// Returns the line and whether this call created it.
  async fn get_or_create_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<(CartLine, bool)>;
  async fn find_open_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<Option<CartLine>>;
  async fn unpurchased_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>>;

  /// Returns the open order and whether this call created it.
  async fn get_or_create_open_order(&self, user_id: Uuid) -> Result<(TestOrder, bool)>;
  async fn find_open_order(&self, user_id: Uuid) -> Result<Option<TestOrder>>;
  /// Open and finalized orders, oldest first.
  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<TestOrder>>;
  /// Set semantics; returns false when the line was already attached.
  async fn attach_line(&self, order_id: Uuid, line_id: Uuid) -> Result<bool>;
  async fn order_line_ids(&self, order_id: Uuid) -> Result<Vec<Uuid>>;
  /// Detaches the line from the order and deletes it in one unit.
  async fn remove_line(&self, order_id: Uuid, line_id: Uuid) -> Result<()>;
  async fn cart_entries(&self, order_id: Uuid) -> Result<Vec<CartEntry>>;
  /// Marks every attached line purchased and closes the order.
  async fn finalize_order(&self, order_id: Uuid, payment_reference: &str) -> Result<TestOrder>;
}

/// Everything the service needs from persistence.
pub trait ClinicStore: AccountStore + DirectoryStore + ClinicalStore + CartStore {}

impl<T> ClinicStore for T where T: AccountStore + DirectoryStore + ClinicalStore + CartStore {}
