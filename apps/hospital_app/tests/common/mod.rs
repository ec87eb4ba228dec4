// apps/hospital_app/tests/common/mod.rs
#![allow(dead_code)]

use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web, App};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use hospital_app::config::{AppConfig, LogFormat};
use hospital_app::models::{
  Account, Doctor, NewAccount, NewPrescription, NewPrescriptionTest, Patient, Prescription, PrescriptionTest, Role,
  TestInformation,
};
use hospital_app::services::auth_service;
use hospital_app::services::mailer::RecordingMailer;
use hospital_app::state::AppState;
use hospital_app::store::{AccountStore, ClinicalStore, DirectoryStore, MemoryStore};
use hospital_app::web::session::session_cookie;

pub const PASSWORD: &str = "s3cure-pass";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: None,
    app_base_url: "https://clinic.test".to_string(),
    site_name: "Clinic Test".to_string(),
    mail_sender: "no-reply@clinic.test".to_string(),
    password_reset_secret: b"integration-test-reset-secret".to_vec(),
    password_reset_timeout_secs: 3600,
    mock_payment_account_id: "mock_lab_acct".to_string(),
    seed_db: false,
    log_format: LogFormat::Pretty,
  }
}

/// A service wired to the in-memory store and a recording mailer.
pub struct TestContext {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub mailer: Arc<RecordingMailer>,
}

/// A prescription as seeded for a patient, with the catalog it draws from.
pub struct PrescriptionFixture {
  pub prescription: Prescription,
  pub tests: Vec<PrescriptionTest>,
  pub catalog: Vec<TestInformation>,
}

impl TestContext {
  pub fn new() -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let state = hospital_app::build_app_state(test_config(), store.clone(), mailer.clone())
      .expect("app state should build");
    Self { state, store, mailer }
  }

  pub fn app(
    &self,
  ) -> App<
    impl ServiceFactory<
      ServiceRequest,
      Config = (),
      Response = ServiceResponse<BoxBody>,
      Error = actix_web::Error,
      InitError = (),
    >,
  > {
    App::new()
      .app_data(web::Data::new(self.state.clone()))
      .configure(hospital_app::web::configure_app_routes)
  }

  pub async fn account(&self, username: &str, email: &str, role: Role) -> Account {
    let password_hash = auth_service::hash_password(PASSWORD).unwrap();
    self
      .store
      .insert_account(NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        role,
      })
      .await
      .unwrap()
  }

  pub async fn patient(&self, username: &str) -> (Account, Patient) {
    let account = self
      .account(username, &format!("{}@example.com", username), Role::Patient)
      .await;
    let patient = self
      .store
      .insert_patient(account.id, Some(format!("Patient {}", username)))
      .await
      .unwrap();
    (account, patient)
  }

  pub async fn doctor(&self, username: &str) -> (Account, Doctor) {
    let account = self
      .account(username, &format!("{}@example.com", username), Role::Doctor)
      .await;
    let doctor = self
      .store
      .insert_doctor(account.id, Some(format!("Dr. {}", username)))
      .await
      .unwrap();
    (account, doctor)
  }

  /// Opens a session the way a successful login does and returns its cookie.
  pub async fn session_for(&self, account: &Account) -> Cookie<'static> {
    let token = auth_service::new_session_token();
    self.store.create_session(account.id, account.role, &token).await.unwrap();
    self.store.set_login_status(account.id, true).await.unwrap();
    session_cookie(&token)
  }

  pub async fn catalog_test(&self, name: &str, price_cents: i32) -> TestInformation {
    self
      .store
      .insert_test_information(TestInformation {
        id: Uuid::new_v4(),
        hospital_id: None,
        test_name: name.to_string(),
        price_cents,
      })
      .await
      .unwrap()
  }

  pub async fn prescription(&self, patient: &Patient, doctor: &Doctor, test_names: &[(&str, i32)]) -> PrescriptionFixture {
    let mut catalog = Vec::new();
    for (name, price) in test_names {
      catalog.push(self.catalog_test(name, *price).await);
    }
    let prescription = self
      .store
      .insert_prescription(NewPrescription {
        patient_id: patient.id,
        doctor_id: doctor.id,
        extra_information: None,
        medicines: Vec::new(),
        tests: catalog
          .iter()
          .map(|c| NewPrescriptionTest {
            test_info_id: c.id,
            test_name: c.test_name.clone(),
            description: None,
          })
          .collect(),
      })
      .await
      .unwrap();
    let tests = self.store.tests_of(prescription.id).await.unwrap();
    PrescriptionFixture {
      prescription,
      tests,
      catalog,
    }
  }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
  resp
    .headers()
    .get(header::LOCATION)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string()
}

pub fn message_texts(body: &Value) -> Vec<String> {
  body["messages"]
    .as_array()
    .map(|msgs| {
      msgs
        .iter()
        .filter_map(|m| m["text"].as_str().map(str::to_string))
        .collect()
    })
    .unwrap_or_default()
}

pub async fn json_body(resp: ServiceResponse<BoxBody>) -> Value {
  test::read_body_json(resp).await
}
