// apps/hospital_app/src/web/mod.rs

pub mod handlers;
pub mod routes;
pub mod session;
pub mod view;

pub use routes::configure_app_routes;
