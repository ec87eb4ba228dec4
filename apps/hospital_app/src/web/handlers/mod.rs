// apps/hospital_app/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod cart_handlers;
pub mod doctor_handlers;
pub mod hospital_handlers;
pub mod password_reset_handlers;
pub mod patient_handlers;
pub mod prescription_handlers;
