// apps/hospital_app/src/web/routes.rs

use actix_web::web;
use serde_json::json;

use crate::web::handlers::{
  auth_handlers, cart_handlers, doctor_handlers, hospital_handlers, password_reset_handlers, patient_handlers,
  prescription_handlers,
};
use crate::web::view;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn login_page_handler() -> actix_web::HttpResponse {
  view::render("login", Vec::new(), json!({}))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(health_check_handler))
    // Accounts and sessions
    .route("/login", web::get().to(login_page_handler))
    .route("/login", web::post().to(auth_handlers::patient_login_handler))
    .route("/doctor/login", web::post().to(auth_handlers::doctor_login_handler))
    .route("/logout", web::post().to(auth_handlers::logout_handler))
    .route("/patient/register", web::post().to(auth_handlers::patient_register_handler))
    .route("/doctor/register", web::post().to(auth_handlers::doctor_register_handler))
    .route(
      "/hospital-admin/accounts",
      web::post().to(auth_handlers::create_staff_account_handler),
    )
    .route(
      "/patient/change-password",
      web::post().to(auth_handlers::change_password_handler),
    )
    // Password reset
    .service(
      web::scope("/password-reset")
        .route("", web::post().to(password_reset_handlers::password_reset_request_handler))
        .route("/done", web::get().to(password_reset_handlers::password_reset_done_handler))
        .route(
          "/{uidb64}/{token}",
          web::get().to(password_reset_handlers::password_reset_link_handler),
        )
        .route(
          "/{uidb64}/{token}",
          web::post().to(password_reset_handlers::password_reset_confirm_handler),
        ),
    )
    // Patient area
    .route("/patient/dashboard", web::get().to(patient_handlers::patient_dashboard_handler))
    .route("/patient/profile", web::get().to(patient_handlers::profile_settings_handler))
    .route("/patient/profile", web::post().to(patient_handlers::update_profile_handler))
    .service(
      web::scope("/prescriptions/{prescription_id}")
        .route("", web::get().to(prescription_handlers::view_prescription_handler))
        .route("/pdf", web::get().to(prescription_handlers::prescription_pdf_handler))
        .route("/delete", web::post().to(prescription_handlers::delete_prescription_handler))
        .route("/cart", web::get().to(cart_handlers::view_cart_handler))
        .route(
          "/tests/{test_info_id}/cart",
          web::post().to(cart_handlers::add_to_cart_handler),
        ),
    )
    .route("/reports/{report_id}", web::get().to(prescription_handlers::view_report_handler))
    .route(
      "/reports/{report_id}/delete",
      web::post().to(prescription_handlers::delete_report_handler),
    )
    // Cart
    .service(
      web::scope("/cart")
        .route(
          "/tests/{item_id}/remove",
          web::post().to(cart_handlers::remove_from_cart_handler),
        )
        .route("/checkout", web::post().to(cart_handlers::checkout_handler)),
    )
    // Hospital directory
    .service(
      web::scope("/hospitals")
        .route("", web::get().to(hospital_handlers::list_hospitals_handler))
        .route("/{hospital_id}", web::get().to(hospital_handlers::hospital_profile_handler))
        .route(
          "/{hospital_id}/departments",
          web::get().to(hospital_handlers::hospital_departments_handler),
        )
        .route(
          "/{hospital_id}/doctor-register",
          web::post().to(hospital_handlers::doctor_register_hospital_handler),
        ),
    )
    .route(
      "/departments/{department_id}/doctors",
      web::get().to(hospital_handlers::department_doctors_handler),
    )
    // Doctors
    .route("/doctor/dashboard", web::get().to(doctor_handlers::doctor_dashboard_handler))
    .route(
      "/doctor/prescriptions",
      web::post().to(doctor_handlers::create_prescription_handler),
    );
}
