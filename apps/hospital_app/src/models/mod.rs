// apps/hospital_app/src/models/mod.rs

//! Records persisted by the store layer.

pub mod account;
pub mod cart;
pub mod clinical;
pub mod hospital;
pub mod profile;

pub use account::{Account, Actor, NewAccount, Role, Session};
pub use cart::{CartEntry, CartLine, TestOrder};
pub use clinical::{
  Appointment, AppointmentStatus, NewMedicine, NewPrescription, NewPrescriptionTest, Prescription,
  PrescriptionDetail, PrescriptionMedicine, PrescriptionTest, Report, Specimen, TestInformation, TestResult,
};
pub use hospital::{Department, Hospital, HospitalService, Specialization};
pub use profile::{Doctor, Patient, RegisterStatus};
