// apps/hospital_app/tests/prescriptions.rs
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use chrono::Utc;
use common::*;
use hospital_app::models::{Report, Specimen, TestResult};
use hospital_app::store::{CartStore, ClinicalStore};
use serde_json::json;
use uuid::Uuid;

#[actix_web::test]
async fn prescription_pdf_is_served_inline() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000), ("Lipid Profile", 120_000)]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/pdf", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
  assert_eq!(
    resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
    "inline; filename=prescription.pdf"
  );
  let body = test::read_body(resp).await;
  assert!(body.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn a_prescription_without_lines_still_renders() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/pdf", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(test::read_body(resp).await.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn someone_elses_prescription_pdf_is_not_found() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (_, owner) = ctx.patient("amina").await;
  let (intruder, _) = ctx.patient("bashir").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&owner, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&intruder).await;

  for uri in [
    format!("/prescriptions/{}/pdf", fx.prescription.id),
    format!("/prescriptions/{}/pdf", Uuid::new_v4()),
  ] {
    let req = test::TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_ne!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
  }
}

#[actix_web::test]
async fn a_storage_failure_during_pdf_export_is_a_server_error() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;
  ctx.store.fail_reads_of("medicines_of");

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/pdf", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body = json_body(resp).await;
  assert_eq!(body["error"], "Database operation failed");
}

#[actix_web::test]
async fn prescription_view_lists_its_tests() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000), ("X-Ray", 80_000)]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "prescription-view");
  assert_eq!(body["prescription_test"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn deleting_a_prescription_drops_its_cart_lines() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post()
    .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id))
    .cookie(cookie.clone())
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
  assert_eq!(ctx.store.unpurchased_lines(account.id).await.unwrap().len(), 1);

  let req = test::TestRequest::post()
    .uri(&format!("/prescriptions/{}/delete", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), "/patient/dashboard");
  assert_eq!(message_texts(&json_body(resp).await), vec!["Prescription Deleted".to_string()]);

  assert!(ctx.store.find_prescription(fx.prescription.id).await.unwrap().is_none());
  assert!(ctx.store.unpurchased_lines(account.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn reports_are_viewed_and_deleted_by_their_patient() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (intruder, _) = ctx.patient("bashir").await;
  let report_id = Uuid::new_v4();
  ctx
    .store
    .insert_report(
      Report {
        id: report_id,
        patient_id: patient.id,
        doctor_id: None,
        test_name: "CBC".to_string(),
        description: None,
        delivery_date: None,
        created_at: Utc::now(),
      },
      vec![Specimen {
        id: Uuid::new_v4(),
        report_id,
        specimen_type: "Blood".to_string(),
        collection_date: None,
        receiving_date: None,
      }],
      vec![TestResult {
        id: Uuid::new_v4(),
        report_id,
        test_name: "Hemoglobin".to_string(),
        result: Some("13.5".to_string()),
        unit: Some("g/dL".to_string()),
        referred_value: Some("12-16".to_string()),
      }],
    )
    .await
    .unwrap();

  let req = test::TestRequest::get()
    .uri(&format!("/reports/{}", report_id))
    .cookie(ctx.session_for(&intruder).await)
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let cookie = ctx.session_for(&account).await;
  let req = test::TestRequest::get()
    .uri(&format!("/reports/{}", report_id))
    .cookie(cookie.clone())
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["view"], "report-view");
  assert_eq!(body["specimen"][0]["specimen_type"], "Blood");
  assert_eq!(body["test"][0]["result"], "13.5");

  let req = test::TestRequest::post()
    .uri(&format!("/reports/{}/delete", report_id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(location(&resp), "/patient/dashboard");
  assert!(ctx.store.find_report(report_id).await.unwrap().is_none());
}

#[actix_web::test]
async fn doctors_issue_prescriptions_from_the_catalog() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (_, patient) = ctx.patient("amina").await;
  let (doctor_account, doctor) = ctx.doctor("drkhan").await;
  let cbc = ctx.catalog_test("CBC", 50_000).await;
  let cookie = ctx.session_for(&doctor_account).await;

  let req = test::TestRequest::post()
    .uri("/doctor/prescriptions")
    .cookie(cookie.clone())
    .set_json(json!({
      "patient_id": patient.id,
      "tests": [{ "test_info_id": Uuid::new_v4() }],
    }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
  assert!(ctx.store.prescriptions_by_doctor(doctor.id).await.unwrap().is_empty());

  let req = test::TestRequest::post()
    .uri("/doctor/prescriptions")
    .cookie(cookie.clone())
    .set_json(json!({
      "patient_id": patient.id,
      "medicines": [{ "medicine_name": "Napa", "dosage": "500mg", "frequency": "1+0+1" }],
      "tests": [{ "test_info_id": cbc.id, "description": "fasting" }],
      "extra_information": "Drink water",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(message_texts(&body), vec!["Prescription Created".to_string()]);

  let issued = ctx.store.prescriptions_by_doctor(doctor.id).await.unwrap();
  assert_eq!(issued.len(), 1);
  let tests = ctx.store.tests_of(issued[0].id).await.unwrap();
  assert_eq!(tests.len(), 1);
  assert_eq!(tests[0].test_name, "CBC");
  assert_eq!(ctx.store.medicines_of(issued[0].id).await.unwrap()[0].medicine_name, "Napa");

  let req = test::TestRequest::get().uri("/doctor/dashboard").cookie(cookie).to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["view"], "doctor-dashboard");
  assert_eq!(body["prescriptions"].as_array().map(Vec::len), Some(1));
}
