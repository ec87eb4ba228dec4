// apps/hospital_app/tests/access_policy.rs
mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;
use common::*;
use hospital_app::models::Role;
use hospital_app::store::{AccountStore, CartStore};
use hospital_app::web::session::SESSION_COOKIE;
use serde_json::json;

fn session_cookie_in<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<Cookie<'static>> {
  resp
    .response()
    .cookies()
    .find(|c| c.name() == SESSION_COOKIE)
    .map(|c| c.into_owned())
}

#[actix_web::test]
async fn cart_routes_without_a_session_redirect_to_login() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (_, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;

  for req in [
    test::TestRequest::get().uri(&format!("/prescriptions/{}/cart", fx.prescription.id)),
    test::TestRequest::post().uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id)),
    test::TestRequest::post().uri(&format!("/cart/tests/{}/remove", fx.tests[0].id)),
  ] {
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
  }
}

#[actix_web::test]
async fn an_unknown_session_token_redirects_to_login() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;

  let req = test::TestRequest::get()
    .uri("/patient/dashboard")
    .cookie(Cookie::new(SESSION_COOKIE, "forged-token"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn a_doctor_on_any_cart_route_loses_the_session() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (_, patient) = ctx.patient("amina").await;
  let (doctor_account, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;

  for req in [
    test::TestRequest::get().uri(&format!("/prescriptions/{}/cart", fx.prescription.id)),
    test::TestRequest::post().uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id)),
    test::TestRequest::post().uri(&format!("/cart/tests/{}/remove", fx.tests[0].id)),
  ] {
    let cookie = ctx.session_for(&doctor_account).await;
    let resp = test::call_service(&app, req.cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let expired = session_cookie_in(&resp).expect("session cookie is expired on the response");
    assert_eq!(expired.value(), "");

    let body = json_body(resp).await;
    assert_eq!(message_texts(&body), vec!["Not Authorized".to_string()]);

    assert!(ctx.store.find_session(cookie.value()).await.unwrap().is_none());
    let account = ctx.store.find_account(doctor_account.id).await.unwrap().unwrap();
    assert!(!account.login_status);
  }
  assert!(ctx.store.unpurchased_lines(doctor_account.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn directory_admits_patients_and_doctors_only() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (patient_account, _) = ctx.patient("amina").await;
  let (doctor_account, _) = ctx.doctor("drkhan").await;
  let admin = ctx.account("head_admin", "admin@example.com", Role::HospitalAdmin).await;

  for account in [&patient_account, &doctor_account] {
    let cookie = ctx.session_for(account).await;
    let req = test::TestRequest::get().uri("/hospitals").cookie(cookie).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  }

  let cookie = ctx.session_for(&admin).await;
  let req = test::TestRequest::get().uri("/hospitals").cookie(cookie.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert!(ctx.store.find_session(cookie.value()).await.unwrap().is_none());
}

#[actix_web::test]
async fn patient_login_sets_the_session_cookie_and_lands_on_the_dashboard() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, _) = ctx.patient("amina").await;

  let req = test::TestRequest::post()
    .uri("/login")
    .set_json(json!({ "username": "amina", "password": PASSWORD }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), "/patient/dashboard");
  let cookie = session_cookie_in(&resp).expect("login sets a session cookie");
  assert!(cookie.http_only().unwrap_or(false));

  let stored = ctx.store.find_account(account.id).await.unwrap().unwrap();
  assert!(stored.login_status);
  assert!(stored.last_login.is_some());

  let req = test::TestRequest::get().uri("/patient/dashboard").cookie(cookie).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "patient-dashboard");
}

#[actix_web::test]
async fn wrong_password_is_rejected() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  ctx.patient("amina").await;

  let req = test::TestRequest::post()
    .uri("/login")
    .set_json(json!({ "username": "amina", "password": "not-the-password" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(session_cookie_in(&resp).map(|c| c.value().is_empty()).unwrap_or(true));
}

#[actix_web::test]
async fn an_unknown_username_answers_like_a_wrong_password() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  ctx.patient("amina").await;

  let mut bodies = Vec::new();
  for username in ["amina", "nobody_here"] {
    let req = test::TestRequest::post()
      .uri("/login")
      .set_json(json!({ "username": username, "password": "not-the-password" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    bodies.push(json_body(resp).await);
  }
  assert_eq!(bodies[0], bodies[1]);
  assert_eq!(bodies[1]["error"], "Invalid username or password");
}

#[actix_web::test]
async fn a_doctor_on_the_patient_portal_is_turned_away() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (doctor_account, _) = ctx.doctor("drkhan").await;

  let req = test::TestRequest::post()
    .uri("/login")
    .set_json(json!({ "username": "drkhan", "password": PASSWORD }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), "/login");
  let body = json_body(resp).await;
  assert_eq!(message_texts(&body), vec!["Invalid credentials. Not a Patient".to_string()]);

  let stored = ctx.store.find_account(doctor_account.id).await.unwrap().unwrap();
  assert!(!stored.login_status);

  let req = test::TestRequest::post()
    .uri("/doctor/login")
    .set_json(json!({ "username": "drkhan", "password": PASSWORD }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(location(&resp), "/doctor/dashboard");
}

#[actix_web::test]
async fn logout_ends_the_session() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, _) = ctx.patient("amina").await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post().uri("/logout").cookie(cookie.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), "/login");

  assert!(ctx.store.find_session(cookie.value()).await.unwrap().is_none());
  assert!(!ctx.store.find_account(account.id).await.unwrap().unwrap().login_status);

  let req = test::TestRequest::get().uri("/patient/dashboard").cookie(cookie).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
}
