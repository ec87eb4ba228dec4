// apps/hospital_app/src/store/memory.rs

//! In-process store. One mutex guards every table, so each trait method is a
//! single critical section and the get-or-create operations are atomic.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{AccountStore, CartStore, ClinicalStore, DirectoryStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Account, Appointment, CartEntry, CartLine, Department, Doctor, Hospital, HospitalService, NewAccount,
  NewPrescription, Patient, Prescription, PrescriptionMedicine, PrescriptionTest, RegisterStatus, Report, Role,
  Session, Specialization, Specimen, TestInformation, TestOrder, TestResult,
};

#[derive(Default)]
struct Tables {
  accounts: Vec<Account>,
  sessions: Vec<Session>,
  patients: Vec<Patient>,
  doctors: Vec<Doctor>,
  hospitals: Vec<Hospital>,
  departments: Vec<Department>,
  specializations: Vec<Specialization>,
  services: Vec<HospitalService>,
  test_catalog: Vec<TestInformation>,
  prescriptions: Vec<Prescription>,
  medicines: Vec<PrescriptionMedicine>,
  prescription_tests: Vec<PrescriptionTest>,
  reports: Vec<Report>,
  specimens: Vec<Specimen>,
  results: Vec<TestResult>,
  appointments: Vec<Appointment>,
  cart_lines: Vec<CartLine>,
  orders: Vec<TestOrder>,
  /// `(order_id, line_id)` membership pairs.
  order_items: Vec<(Uuid, Uuid)>,
}

impl Tables {
  /// Drops cart lines (and their memberships) that buy any of `item_ids`.
  fn drop_lines_for_items(&mut self, item_ids: &[Uuid]) {
    let doomed: Vec<Uuid> = self
      .cart_lines
      .iter()
      .filter(|l| item_ids.contains(&l.item_id))
      .map(|l| l.id)
      .collect();
    self.cart_lines.retain(|l| !doomed.contains(&l.id));
    self.order_items.retain(|(_, line_id)| !doomed.contains(line_id));
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
  failing: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes every later call of the named read (`medicines_of`, `tests_of`)
  /// fail the way a lost database connection does.
  pub fn fail_reads_of(&self, operation: &'static str) {
    self.failing.lock().push(operation);
  }

  fn check_read(&self, operation: &'static str) -> Result<()> {
    if self.failing.lock().contains(&operation) {
      return Err(AppError::Sqlx(sqlx::Error::PoolTimedOut));
    }
    Ok(())
  }

  fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
    let mut guard = self.tables.lock();
    f(&mut guard)
  }
}

#[async_trait]
impl AccountStore for MemoryStore {
  async fn insert_account(&self, new_account: NewAccount) -> Result<Account> {
    self.with(|t| {
      let lowered = new_account.username.to_lowercase();
      if t.accounts.iter().any(|a| a.username.to_lowercase() == lowered) {
        return Err(AppError::Validation(
          "Username already exists. Please choose a different one.".to_string(),
        ));
      }
      let account = Account {
        id: Uuid::new_v4(),
        username: new_account.username,
        email: new_account.email,
        password_hash: new_account.password_hash,
        role: new_account.role,
        login_status: false,
        last_login: None,
        created_at: Utc::now(),
      };
      t.accounts.push(account.clone());
      Ok(account)
    })
  }

  async fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
    Ok(self.with(|t| t.accounts.iter().find(|a| a.id == id).cloned()))
  }

  async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
    Ok(self.with(|t| t.accounts.iter().find(|a| a.username == username).cloned()))
  }

  async fn username_taken(&self, username: &str) -> Result<bool> {
    let lowered = username.to_lowercase();
    Ok(self.with(|t| t.accounts.iter().any(|a| a.username.to_lowercase() == lowered)))
  }

  async fn find_accounts_by_email(&self, email: &str) -> Result<Vec<Account>> {
    let lowered = email.to_lowercase();
    Ok(self.with(|t| {
      t.accounts
        .iter()
        .filter(|a| a.email.to_lowercase() == lowered)
        .cloned()
        .collect()
    }))
  }

  async fn update_password_hash(&self, account_id: Uuid, password_hash: &str) -> Result<()> {
    self.with(|t| match t.accounts.iter_mut().find(|a| a.id == account_id) {
      Some(account) => {
        account.password_hash = password_hash.to_string();
        Ok(())
      }
      None => Err(AppError::NotFound(format!("Account {} not found.", account_id))),
    })
  }

  async fn set_login_status(&self, account_id: Uuid, online: bool) -> Result<()> {
    self.with(|t| {
      if let Some(account) = t.accounts.iter_mut().find(|a| a.id == account_id) {
        account.login_status = online;
        if online {
          account.last_login = Some(Utc::now());
        }
      }
    });
    Ok(())
  }

  async fn create_session(&self, account_id: Uuid, role: Role, token: &str) -> Result<Session> {
    let session = Session {
      token: token.to_string(),
      account_id,
      role,
      created_at: Utc::now(),
    };
    self.with(|t| t.sessions.push(session.clone()));
    Ok(session)
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>> {
    Ok(self.with(|t| t.sessions.iter().find(|s| s.token == token).cloned()))
  }

  async fn delete_session(&self, token: &str) -> Result<()> {
    self.with(|t| t.sessions.retain(|s| s.token != token));
    Ok(())
  }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
  async fn insert_patient(&self, account_id: Uuid, name: Option<String>) -> Result<Patient> {
    let patient = Patient {
      id: Uuid::new_v4(),
      account_id,
      name,
      ..Default::default()
    };
    self.with(|t| t.patients.push(patient.clone()));
    Ok(patient)
  }

  async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
    Ok(self.with(|t| t.patients.iter().find(|p| p.id == id).cloned()))
  }

  async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<Patient>> {
    Ok(self.with(|t| t.patients.iter().find(|p| p.account_id == account_id).cloned()))
  }

  async fn update_patient(&self, patient: &Patient) -> Result<()> {
    self.with(|t| match t.patients.iter_mut().find(|p| p.id == patient.id) {
      Some(slot) => {
        *slot = patient.clone();
        Ok(())
      }
      None => Err(AppError::NotFound("Patient profile not found.".to_string())),
    })
  }

  async fn insert_doctor(&self, account_id: Uuid, name: Option<String>) -> Result<Doctor> {
    let doctor = Doctor {
      id: Uuid::new_v4(),
      account_id,
      name,
      hospital_id: None,
      department_id: None,
      specialization_id: None,
      register_status: RegisterStatus::Pending,
      certificate_image: None,
      created_at: Utc::now(),
    };
    self.with(|t| t.doctors.push(doctor.clone()));
    Ok(doctor)
  }

  async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
    Ok(self.with(|t| t.doctors.iter().find(|d| d.id == id).cloned()))
  }

  async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>> {
    Ok(self.with(|t| t.doctors.iter().find(|d| d.account_id == account_id).cloned()))
  }

  async fn update_doctor(&self, doctor: &Doctor) -> Result<()> {
    self.with(|t| match t.doctors.iter_mut().find(|d| d.id == doctor.id) {
      Some(slot) => {
        *slot = doctor.clone();
        Ok(())
      }
      None => Err(AppError::NotFound("Doctor profile not found.".to_string())),
    })
  }

  async fn accepted_doctors_in_department(&self, department_id: Uuid) -> Result<Vec<Doctor>> {
    Ok(self.with(|t| {
      t.doctors
        .iter()
        .filter(|d| d.department_id == Some(department_id) && d.register_status == RegisterStatus::Accepted)
        .cloned()
        .collect()
    }))
  }

  async fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital> {
    self.with(|t| t.hospitals.push(hospital.clone()));
    Ok(hospital)
  }

  async fn list_hospitals(&self) -> Result<Vec<Hospital>> {
    Ok(self.with(|t| t.hospitals.clone()))
  }

  async fn find_hospital(&self, id: Uuid) -> Result<Option<Hospital>> {
    Ok(self.with(|t| t.hospitals.iter().find(|h| h.id == id).cloned()))
  }

  async fn insert_department(&self, hospital_id: Uuid, name: &str) -> Result<Department> {
    let department = Department {
      id: Uuid::new_v4(),
      hospital_id,
      name: name.to_string(),
    };
    self.with(|t| t.departments.push(department.clone()));
    Ok(department)
  }

  async fn find_department(&self, id: Uuid) -> Result<Option<Department>> {
    Ok(self.with(|t| t.departments.iter().find(|d| d.id == id).cloned()))
  }

  async fn departments_of(&self, hospital_id: Uuid) -> Result<Vec<Department>> {
    Ok(self.with(|t| t.departments.iter().filter(|d| d.hospital_id == hospital_id).cloned().collect()))
  }

  async fn insert_specialization(&self, hospital_id: Uuid, name: &str) -> Result<Specialization> {
    let specialization = Specialization {
      id: Uuid::new_v4(),
      hospital_id,
      name: name.to_string(),
    };
    self.with(|t| t.specializations.push(specialization.clone()));
    Ok(specialization)
  }

  async fn find_specialization(&self, id: Uuid) -> Result<Option<Specialization>> {
    Ok(self.with(|t| t.specializations.iter().find(|s| s.id == id).cloned()))
  }

  async fn specializations_of(&self, hospital_id: Uuid) -> Result<Vec<Specialization>> {
    Ok(self.with(|t| {
      t.specializations
        .iter()
        .filter(|s| s.hospital_id == hospital_id)
        .cloned()
        .collect()
    }))
  }

  async fn insert_service(&self, hospital_id: Uuid, name: &str) -> Result<HospitalService> {
    let service = HospitalService {
      id: Uuid::new_v4(),
      hospital_id,
      name: name.to_string(),
    };
    self.with(|t| t.services.push(service.clone()));
    Ok(service)
  }

  async fn services_of(&self, hospital_id: Uuid) -> Result<Vec<HospitalService>> {
    Ok(self.with(|t| t.services.iter().filter(|s| s.hospital_id == hospital_id).cloned().collect()))
  }
}

#[async_trait]
impl ClinicalStore for MemoryStore {
  async fn insert_test_information(&self, test: TestInformation) -> Result<TestInformation> {
    self.with(|t| t.test_catalog.push(test.clone()));
    Ok(test)
  }

  async fn find_test_information(&self, id: Uuid) -> Result<Option<TestInformation>> {
    Ok(self.with(|t| t.test_catalog.iter().find(|c| c.id == id).cloned()))
  }

  async fn insert_prescription(&self, new_prescription: NewPrescription) -> Result<Prescription> {
    let prescription = Prescription {
      id: Uuid::new_v4(),
      patient_id: new_prescription.patient_id,
      doctor_id: new_prescription.doctor_id,
      extra_information: new_prescription.extra_information,
      created_at: Utc::now(),
    };
    self.with(|t| {
      for m in new_prescription.medicines {
        t.medicines.push(PrescriptionMedicine {
          id: Uuid::new_v4(),
          prescription_id: prescription.id,
          medicine_name: m.medicine_name,
          quantity: m.quantity,
          dosage: m.dosage,
          frequency: m.frequency,
          duration: m.duration,
          instruction: m.instruction,
        });
      }
      for test in new_prescription.tests {
        t.prescription_tests.push(PrescriptionTest {
          id: Uuid::new_v4(),
          prescription_id: prescription.id,
          test_info_id: test.test_info_id,
          test_name: test.test_name,
          description: test.description,
        });
      }
      t.prescriptions.push(prescription.clone());
    });
    Ok(prescription)
  }

  async fn find_prescription(&self, id: Uuid) -> Result<Option<Prescription>> {
    Ok(self.with(|t| t.prescriptions.iter().find(|p| p.id == id).cloned()))
  }

  async fn prescriptions_for_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>> {
    Ok(self.with(|t| {
      t.prescriptions
        .iter()
        .rev()
        .filter(|p| p.patient_id == patient_id)
        .cloned()
        .collect()
    }))
  }

  async fn prescriptions_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Prescription>> {
    Ok(self.with(|t| {
      t.prescriptions
        .iter()
        .rev()
        .filter(|p| p.doctor_id == doctor_id)
        .cloned()
        .collect()
    }))
  }

  async fn medicines_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionMedicine>> {
    self.check_read("medicines_of")?;
    Ok(self.with(|t| {
      t.medicines
        .iter()
        .filter(|m| m.prescription_id == prescription_id)
        .cloned()
        .collect()
    }))
  }

  async fn tests_of(&self, prescription_id: Uuid) -> Result<Vec<PrescriptionTest>> {
    self.check_read("tests_of")?;
    Ok(self.with(|t| {
      t.prescription_tests
        .iter()
        .filter(|pt| pt.prescription_id == prescription_id)
        .cloned()
        .collect()
    }))
  }

  async fn find_prescription_test(&self, id: Uuid) -> Result<Option<PrescriptionTest>> {
    Ok(self.with(|t| t.prescription_tests.iter().find(|pt| pt.id == id).cloned()))
  }

  async fn find_prescription_test_for(
    &self,
    prescription_id: Uuid,
    test_info_id: Uuid,
  ) -> Result<Option<PrescriptionTest>> {
    Ok(self.with(|t| {
      t.prescription_tests
        .iter()
        .find(|pt| pt.prescription_id == prescription_id && pt.test_info_id == test_info_id)
        .cloned()
    }))
  }

  async fn delete_prescription(&self, id: Uuid) -> Result<bool> {
    Ok(self.with(|t| {
      let before = t.prescriptions.len();
      t.prescriptions.retain(|p| p.id != id);
      if t.prescriptions.len() == before {
        return false;
      }
      let item_ids: Vec<Uuid> = t
        .prescription_tests
        .iter()
        .filter(|pt| pt.prescription_id == id)
        .map(|pt| pt.id)
        .collect();
      t.drop_lines_for_items(&item_ids);
      t.prescription_tests.retain(|pt| pt.prescription_id != id);
      t.medicines.retain(|m| m.prescription_id != id);
      true
    }))
  }

  async fn insert_report(&self, report: Report, specimens: Vec<Specimen>, results: Vec<TestResult>) -> Result<Report> {
    self.with(|t| {
      t.specimens.extend(specimens);
      t.results.extend(results);
      t.reports.push(report.clone());
    });
    Ok(report)
  }

  async fn reports_for_patient(&self, patient_id: Uuid) -> Result<Vec<Report>> {
    Ok(self.with(|t| t.reports.iter().filter(|r| r.patient_id == patient_id).cloned().collect()))
  }

  async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
    Ok(self.with(|t| t.reports.iter().find(|r| r.id == id).cloned()))
  }

  async fn specimens_of(&self, report_id: Uuid) -> Result<Vec<Specimen>> {
    Ok(self.with(|t| t.specimens.iter().filter(|s| s.report_id == report_id).cloned().collect()))
  }

  async fn results_of(&self, report_id: Uuid) -> Result<Vec<TestResult>> {
    Ok(self.with(|t| t.results.iter().filter(|r| r.report_id == report_id).cloned().collect()))
  }

  async fn delete_report(&self, id: Uuid) -> Result<bool> {
    Ok(self.with(|t| {
      let before = t.reports.len();
      t.reports.retain(|r| r.id != id);
      t.specimens.retain(|s| s.report_id != id);
      t.results.retain(|r| r.report_id != id);
      t.reports.len() != before
    }))
  }

  async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment> {
    self.with(|t| t.appointments.push(appointment.clone()));
    Ok(appointment)
  }

  async fn active_appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
    Ok(self.with(|t| {
      t.appointments
        .iter()
        .filter(|a| a.patient_id == patient_id && a.status.is_active())
        .cloned()
        .collect()
    }))
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn get_or_create_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<(CartLine, bool)> {
    Ok(self.with(|t| {
      if let Some(line) = t
        .cart_lines
        .iter()
        .find(|l| l.item_id == item_id && l.user_id == user_id && !l.purchased)
      {
        return (line.clone(), false);
      }
      let line = CartLine {
        id: Uuid::new_v4(),
        item_id,
        user_id,
        purchased: false,
        created_at: Utc::now(),
      };
      t.cart_lines.push(line.clone());
      (line, true)
    }))
  }

  async fn find_open_cart_line(&self, item_id: Uuid, user_id: Uuid) -> Result<Option<CartLine>> {
    Ok(self.with(|t| {
      t.cart_lines
        .iter()
        .find(|l| l.item_id == item_id && l.user_id == user_id && !l.purchased)
        .cloned()
    }))
  }

  async fn unpurchased_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
    Ok(self.with(|t| {
      t.cart_lines
        .iter()
        .filter(|l| l.user_id == user_id && !l.purchased)
        .cloned()
        .collect()
    }))
  }

  async fn get_or_create_open_order(&self, user_id: Uuid) -> Result<(TestOrder, bool)> {
    Ok(self.with(|t| {
      if let Some(order) = t.orders.iter().find(|o| o.user_id == user_id && !o.ordered) {
        return (order.clone(), false);
      }
      let order = TestOrder {
        id: Uuid::new_v4(),
        user_id,
        ordered: false,
        ordered_at: None,
        payment_reference: None,
        created_at: Utc::now(),
      };
      t.orders.push(order.clone());
      (order, true)
    }))
  }

  async fn find_open_order(&self, user_id: Uuid) -> Result<Option<TestOrder>> {
    Ok(self.with(|t| t.orders.iter().find(|o| o.user_id == user_id && !o.ordered).cloned()))
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<TestOrder>> {
    Ok(self.with(|t| t.orders.iter().filter(|o| o.user_id == user_id).cloned().collect()))
  }

  async fn attach_line(&self, order_id: Uuid, line_id: Uuid) -> Result<bool> {
    self.with(|t| {
      let open = t.orders.iter().any(|o| o.id == order_id && !o.ordered);
      if !open {
        return Err(AppError::Internal(format!("Order {} is not open.", order_id)));
      }
      if !t.cart_lines.iter().any(|l| l.id == line_id) {
        return Err(AppError::NotFound(format!("Cart line {} not found.", line_id)));
      }
      if t.order_items.contains(&(order_id, line_id)) {
        return Ok(false);
      }
      t.order_items.push((order_id, line_id));
      Ok(true)
    })
  }

  async fn order_line_ids(&self, order_id: Uuid) -> Result<Vec<Uuid>> {
    Ok(self.with(|t| {
      t.order_items
        .iter()
        .filter(|(o, _)| *o == order_id)
        .map(|(_, line_id)| *line_id)
        .collect()
    }))
  }

  async fn remove_line(&self, order_id: Uuid, line_id: Uuid) -> Result<()> {
    self.with(|t| {
      t.order_items.retain(|(o, l)| !(*o == order_id && *l == line_id));
      t.cart_lines.retain(|l| l.id != line_id);
      t.order_items.retain(|(_, l)| *l != line_id);
    });
    Ok(())
  }

  async fn cart_entries(&self, order_id: Uuid) -> Result<Vec<CartEntry>> {
    Ok(self.with(|t| {
      t.order_items
        .iter()
        .filter(|(o, _)| *o == order_id)
        .filter_map(|(_, line_id)| {
          let line = t.cart_lines.iter().find(|l| l.id == *line_id)?;
          let item = t.prescription_tests.iter().find(|pt| pt.id == line.item_id)?;
          let price_cents = t
            .test_catalog
            .iter()
            .find(|c| c.id == item.test_info_id)
            .map(|c| c.price_cents)
            .unwrap_or(0);
          Some(CartEntry {
            line_id: line.id,
            item_id: item.id,
            prescription_id: item.prescription_id,
            test_name: item.test_name.clone(),
            price_cents,
          })
        })
        .collect()
    }))
  }

  async fn finalize_order(&self, order_id: Uuid, payment_reference: &str) -> Result<TestOrder> {
    self.with(|t| {
      let line_ids: Vec<Uuid> = t
        .order_items
        .iter()
        .filter(|(o, _)| *o == order_id)
        .map(|(_, l)| *l)
        .collect();
      let order = t
        .orders
        .iter_mut()
        .find(|o| o.id == order_id && !o.ordered)
        .ok_or_else(|| AppError::NotFound("You don't have an active order".to_string()))?;
      order.ordered = true;
      order.ordered_at = Some(Utc::now());
      order.payment_reference = Some(payment_reference.to_string());
      let finalized = order.clone();
      for line in t.cart_lines.iter_mut().filter(|l| line_ids.contains(&l.id)) {
        line.purchased = true;
      }
      Ok(finalized)
    })
  }
}
