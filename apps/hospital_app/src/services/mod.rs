// apps/hospital_app/src/services/mod.rs

pub mod auth_service;
pub mod mailer;
pub mod payment_mock;
pub mod pdf;
pub mod reset_token;
pub mod templates;
pub mod username;
