// apps/hospital_app/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `wardflow::ContextData`; the web handler keeps a clone and reads the final
//! state after the run.

use crate::models::{
  Account, Actor, CartEntry, CartLine, Doctor, NewMedicine, Prescription, PrescriptionDetail, PrescriptionTest,
  Role, TestOrder,
};
use crate::services::mailer::OutgoingMail;
use crate::services::payment_mock::MockCharge;
use crate::services::username::Username;
use crate::state::AppState;
use uuid::Uuid;

// --- Test ordering ---

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub prescription_id: Uuid,
  pub test_info_id: Uuid,
  pub item: Option<PrescriptionTest>,
  pub line: Option<CartLine>,
  pub line_created: bool,
  pub order: Option<TestOrder>,
  pub order_created: bool,
  /// False when the line was already in the order.
  pub newly_attached: bool,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, actor: Actor, prescription_id: Uuid, test_info_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      prescription_id,
      test_info_id,
      item: None,
      line: None,
      line_created: false,
      order: None,
      order_created: false,
      newly_attached: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
  Removed,
  NotInCart,
  NoOpenOrder,
}

#[derive(Clone)]
pub struct RemoveFromCartCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  /// `PrescriptionTest` id.
  pub item_id: Uuid,
  pub item: Option<PrescriptionTest>,
  pub order: Option<TestOrder>,
  pub line: Option<CartLine>,
  pub outcome: Option<RemoveOutcome>,
  pub remaining: Vec<CartEntry>,
}

impl RemoveFromCartCtxData {
  pub fn new(app_state: AppState, actor: Actor, item_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      item_id,
      item: None,
      order: None,
      line: None,
      outcome: None,
      remaining: Vec::new(),
    }
  }
}

#[derive(Debug, Clone)]
pub enum CartView {
  Cart {
    order: TestOrder,
    entries: Vec<CartEntry>,
    total_cents: i64,
  },
  /// Nothing to show; fall back to the prescription.
  Empty,
}

#[derive(Clone)]
pub struct ViewCartCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub prescription_id: Uuid,
  pub detail: Option<PrescriptionDetail>,
  pub unpurchased: Vec<CartLine>,
  pub order: Option<TestOrder>,
  pub view: Option<CartView>,
}

impl ViewCartCtxData {
  pub fn new(app_state: AppState, actor: Actor, prescription_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      prescription_id,
      detail: None,
      unpurchased: Vec::new(),
      order: None,
      view: None,
    }
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub currency_code: String,
  pub order: Option<TestOrder>,
  pub entries: Vec<CartEntry>,
  pub total_cents: i64,
  pub charge: Option<MockCharge>,
  pub finalized: Option<TestOrder>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, actor: Actor) -> Self {
    Self {
      app_state,
      actor,
      currency_code: "bdt".to_string(),
      order: None,
      entries: Vec::new(),
      total_cents: 0,
      charge: None,
      finalized: None,
    }
  }
}

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub role: Role,
  pub username: String,
  pub email: String,
  pub password1: String,
  pub password2: String,
  pub name: Option<String>,
  pub validated_username: Option<Username>,
  pub created_account: Option<Account>,
  pub profile_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  /// Role the login portal admits.
  pub portal: Role,
  pub username: String,
  pub password: String,
  pub account: Option<Account>,
  pub session_token: Option<String>,
}

#[derive(Clone)]
pub struct PasswordResetRequestCtxData {
  pub app_state: AppState,
  pub email: String,
  pub account: Option<Account>,
  pub uid: Option<String>,
  pub token: Option<String>,
  pub mail: Option<OutgoingMail>,
  pub message_id: Option<String>,
}

#[derive(Clone)]
pub struct PasswordResetConfirmCtxData {
  pub app_state: AppState,
  pub uidb64: String,
  pub token: String,
  pub new_password: String,
  pub confirm_password: String,
  pub account: Option<Account>,
  pub password_changed: bool,
}

// --- Doctors ---

#[derive(Clone)]
pub struct HospitalRegistrationCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub hospital_id: Uuid,
  pub department_id: Uuid,
  pub specialization_id: Uuid,
  pub certificate_image: Option<String>,
  pub doctor: Option<Doctor>,
}

#[derive(Debug, Clone)]
pub struct RequestedTest {
  pub test_info_id: Uuid,
  pub description: Option<String>,
}

#[derive(Clone)]
pub struct CreatePrescriptionCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub patient_id: Uuid,
  pub medicines: Vec<NewMedicine>,
  pub tests: Vec<RequestedTest>,
  pub extra_information: Option<String>,
  pub doctor: Option<Doctor>,
  pub created: Option<Prescription>,
}
