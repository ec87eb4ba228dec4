// apps/hospital_app/tests/cart_workflow.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::*;
use hospital_app::store::CartStore;

#[actix_web::test]
async fn adding_the_same_test_twice_keeps_one_line_and_one_membership() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;
  let uri = format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id);

  for _ in 0..2 {
    let req = test::TestRequest::post().uri(&uri).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/prescriptions/{}", fx.prescription.id));
  }

  let lines = ctx.store.unpurchased_lines(account.id).await.unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].item_id, fx.tests[0].id);
  let order = ctx.store.find_open_order(account.id).await.unwrap().expect("open order");
  assert_eq!(ctx.store.order_line_ids(order.id).await.unwrap(), vec![lines[0].id]);
  assert_eq!(ctx.store.orders_for_user(account.id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn adding_a_test_outside_the_prescription_is_not_found() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let stray = ctx.catalog_test("MRI", 900_000).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post()
    .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, stray.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(ctx.store.unpurchased_lines(account.id).await.unwrap().is_empty());
  assert!(ctx.store.find_open_order(account.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn another_patients_prescription_is_not_found() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (_, owner) = ctx.patient("amina").await;
  let (intruder, _) = ctx.patient("bashir").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&owner, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&intruder).await;

  let req = test::TestRequest::post()
    .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id))
    .cookie(cookie.clone())
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/cart", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn view_cart_lists_lines_with_total() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx
    .prescription(&patient, &doctor, &[("CBC", 50_000), ("Lipid Profile", 120_000)])
    .await;
  let cookie = ctx.session_for(&account).await;

  for info in &fx.catalog {
    let req = test::TestRequest::post()
      .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, info.id))
      .cookie(cookie.clone())
      .to_request();
    test::call_service(&app, req).await;
  }

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/cart", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "test-cart");
  assert_eq!(body["test_carts"].as_array().map(Vec::len), Some(2));
  assert_eq!(body["total_cents"], 170_000);
}

#[actix_web::test]
async fn view_cart_without_lines_falls_back_to_the_prescription() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::get()
    .uri(&format!("/prescriptions/{}/cart", fx.prescription.id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "prescription-view");
  assert_eq!(message_texts(&body), vec!["You don't have any test in your cart!".to_string()]);
  assert_eq!(body["prescription_test"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn removing_a_line_deletes_it_and_its_membership() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx
    .prescription(&patient, &doctor, &[("CBC", 50_000), ("ECG", 80_000)])
    .await;
  let cookie = ctx.session_for(&account).await;

  for info in &fx.catalog {
    let req = test::TestRequest::post()
      .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, info.id))
      .cookie(cookie.clone())
      .to_request();
    test::call_service(&app, req).await;
  }
  let order = ctx.store.find_open_order(account.id).await.unwrap().unwrap();

  let req = test::TestRequest::post()
    .uri(&format!("/cart/tests/{}/remove", fx.tests[0].id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "test-cart");
  assert_eq!(body["test_carts"].as_array().map(Vec::len), Some(1));
  assert_eq!(body["test_carts"][0]["item_id"], fx.tests[1].id.to_string());

  let lines = ctx.store.unpurchased_lines(account.id).await.unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].item_id, fx.tests[1].id);
  assert_eq!(ctx.store.order_line_ids(order.id).await.unwrap(), vec![lines[0].id]);
}

#[actix_web::test]
async fn removing_a_test_not_in_the_cart_changes_nothing() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx
    .prescription(&patient, &doctor, &[("CBC", 50_000), ("ECG", 80_000)])
    .await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post()
    .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id))
    .cookie(cookie.clone())
    .to_request();
  test::call_service(&app, req).await;
  let before = ctx.store.unpurchased_lines(account.id).await.unwrap();

  let req = test::TestRequest::post()
    .uri(&format!("/cart/tests/{}/remove", fx.tests[1].id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "prescription-view");
  assert_eq!(message_texts(&body), vec!["This test was not in your cart".to_string()]);
  assert_eq!(ctx.store.unpurchased_lines(account.id).await.unwrap(), before);
}

#[actix_web::test]
async fn removing_without_an_open_order_redirects_to_the_prescription() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post()
    .uri(&format!("/cart/tests/{}/remove", fx.tests[0].id))
    .cookie(cookie)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp), format!("/prescriptions/{}", fx.prescription.id));
  let body = json_body(resp).await;
  assert_eq!(message_texts(&body), vec!["You don't have an active order".to_string()]);
}

#[actix_web::test]
async fn checkout_closes_the_order_and_the_next_add_opens_a_new_one() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000)]).await;
  let cookie = ctx.session_for(&account).await;
  let add_uri = format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, fx.catalog[0].id);

  let req = test::TestRequest::post().uri(&add_uri).cookie(cookie.clone()).to_request();
  test::call_service(&app, req).await;
  let first = ctx.store.find_open_order(account.id).await.unwrap().unwrap();

  let req = test::TestRequest::post().uri("/cart/checkout").cookie(cookie.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["view"], "order-summary");
  assert_eq!(body["test_order"]["ordered"], true);
  assert_eq!(body["total_cents"], 50_000);

  assert!(ctx.store.find_open_order(account.id).await.unwrap().is_none());
  assert!(ctx.store.unpurchased_lines(account.id).await.unwrap().is_empty());

  let req = test::TestRequest::post().uri(&add_uri).cookie(cookie).to_request();
  test::call_service(&app, req).await;
  let second = ctx.store.find_open_order(account.id).await.unwrap().unwrap();
  assert_ne!(first.id, second.id);
  assert_eq!(ctx.store.unpurchased_lines(account.id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn checkout_with_an_empty_cart_is_rejected() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, _) = ctx.patient("amina").await;
  let cookie = ctx.session_for(&account).await;

  let req = test::TestRequest::post().uri("/cart/checkout").cookie(cookie).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn concurrent_adds_leave_a_single_open_order() {
  let ctx = TestContext::new();
  let app = test::init_service(ctx.app()).await;
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx
    .prescription(&patient, &doctor, &[("CBC", 50_000), ("ECG", 80_000), ("Lipid Profile", 120_000)])
    .await;
  let cookie = ctx.session_for(&account).await;

  let calls = fx.catalog.iter().map(|info| {
    let req = test::TestRequest::post()
      .uri(&format!("/prescriptions/{}/tests/{}/cart", fx.prescription.id, info.id))
      .cookie(cookie.clone())
      .to_request();
    test::call_service(&app, req)
  });
  for resp in futures_util::future::join_all(calls).await {
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  }

  let orders = ctx.store.orders_for_user(account.id).await.unwrap();
  assert_eq!(orders.iter().filter(|o| !o.ordered).count(), 1);
  assert_eq!(ctx.store.order_line_ids(orders[0].id).await.unwrap().len(), 3);
}

#[actix_web::test]
async fn concurrent_checkouts_settle_on_one_charge() {
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
  test::call_service(&app, req).await;

  let calls = (0..2).map(|_| {
    let req = test::TestRequest::post().uri("/cart/checkout").cookie(cookie.clone()).to_request();
    test::call_service(&app, req)
  });
  let mut references = Vec::new();
  for resp in futures_util::future::join_all(calls).await {
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    references.push(body["test_order"]["payment_reference"].as_str().unwrap().to_string());
  }
  assert_eq!(references[0], references[1]);

  let orders = ctx.store.orders_for_user(account.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert!(orders[0].ordered);
  assert_eq!(orders[0].payment_reference.as_deref(), Some(references[0].as_str()));
}

#[actix_web::test]
async fn a_finalized_order_takes_no_new_lines() {
  let ctx = TestContext::new();
  let (account, patient) = ctx.patient("amina").await;
  let (_, doctor) = ctx.doctor("drkhan").await;
  let fx = ctx.prescription(&patient, &doctor, &[("CBC", 50_000), ("ECG", 80_000)]).await;

  let (order, _) = ctx.store.get_or_create_open_order(account.id).await.unwrap();
  let (first, _) = ctx.store.get_or_create_cart_line(fx.tests[0].id, account.id).await.unwrap();
  assert!(ctx.store.attach_line(order.id, first.id).await.unwrap());
  ctx.store.finalize_order(order.id, "mock_ch_done").await.unwrap();

  let (late, _) = ctx.store.get_or_create_cart_line(fx.tests[1].id, account.id).await.unwrap();
  assert!(ctx.store.attach_line(order.id, late.id).await.is_err());
  assert_eq!(ctx.store.order_line_ids(order.id).await.unwrap(), vec![first.id]);
  let unpurchased = ctx.store.unpurchased_lines(account.id).await.unwrap();
  assert_eq!(unpurchased.len(), 1);
  assert_eq!(unpurchased[0].id, late.id);
}
