// apps/hospital_app/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use wardflow::{ContextData, PipelineResult};

use crate::errors::AppError;
use crate::models::{CartEntry, PrescriptionDetail, TestOrder};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{
  AddToCartCtxData, CartView, CheckoutCtxData, RemoveFromCartCtxData, RemoveOutcome, ViewCartCtxData,
};
use crate::state::AppState;
use crate::web::session::{Authorized, PatientOnly};
use crate::web::view::{self, Flash};

pub const NO_ACTIVE_ORDER: &str = "You don't have an active order";
pub const NOT_IN_CART: &str = "This test was not in your cart";
pub const EMPTY_CART: &str = "You don't have any test in your cart!";

fn cart_view(order: &TestOrder, entries: &[CartEntry], total_cents: i64, prescription_id: Uuid, messages: Vec<Flash>) -> HttpResponse {
  view::render(
    "test-cart",
    messages,
    json!({
      "test_order": order,
      "test_carts": entries,
      "total_cents": total_cents,
      "prescription_id": prescription_id,
    }),
  )
}

pub(crate) fn prescription_view(detail: &PrescriptionDetail, messages: Vec<Flash>) -> HttpResponse {
  view::render(
    "prescription-view",
    messages,
    json!({
      "prescription": detail.prescription,
      "prescription_medicine": detail.medicines,
      "prescription_test": detail.tests,
    }),
  )
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, path, auth),
  fields(account_id = %auth.actor.account_id)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(Uuid, Uuid)>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let (prescription_id, test_info_id) = path.into_inner();
  let ctx_data = ContextData::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    auth.actor,
    prescription_id,
    test_info_id,
  ));

  match app_state.registry.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let newly_attached = ctx_data.read().newly_attached;
      let messages = if newly_attached {
        vec![Flash::info("This test is added to your cart!")]
      } else {
        Vec::new()
      };
      Ok(view::redirect(&format!("/prescriptions/{}", prescription_id), messages))
    }
    PipelineResult::Stopped => {
      warn!("Add-to-cart pipeline stopped unexpectedly.");
      Err(AppError::Internal("Process to add test to cart was halted.".to_string()))
    }
  }
}

#[instrument(
  name = "handler::remove_from_cart",
  skip(app_state, path, auth),
  fields(account_id = %auth.actor.account_id)
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let ctx_data = ContextData::new(RemoveFromCartCtxData::new(app_state.get_ref().clone(), auth.actor, item_id));

  app_state.registry.run(ctx_data.clone()).await?;

  let final_ctx = ctx_data.snapshot();
  let prescription_id = final_ctx
    .item
    .as_ref()
    .map(|i| i.prescription_id)
    .ok_or_else(|| AppError::Internal("Cart item unresolved after removal run.".to_string()))?;

  match final_ctx.outcome {
    Some(RemoveOutcome::Removed) => {
      let order = final_ctx
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Order missing after removal.".to_string()))?;
      let total_cents = final_ctx.remaining.iter().map(|e| i64::from(e.price_cents)).sum();
      info!(%item_id, remaining = final_ctx.remaining.len(), "Cart item removed.");
      Ok(cart_view(
        order,
        &final_ctx.remaining,
        total_cents,
        prescription_id,
        vec![Flash::warning("This test was removed from your cart!")],
      ))
    }
    Some(RemoveOutcome::NotInCart) => {
      let store = app_state.store.as_ref();
      let prescription = common_steps::owned_prescription(store, &auth.actor, prescription_id).await?;
      let detail = common_steps::prescription_detail(store, prescription).await?;
      Ok(prescription_view(&detail, vec![Flash::info(NOT_IN_CART)]))
    }
    Some(RemoveOutcome::NoOpenOrder) => Ok(view::redirect(
      &format!("/prescriptions/{}", prescription_id),
      vec![Flash::info(NO_ACTIVE_ORDER)],
    )),
    None => Err(AppError::Internal("Removal finished without an outcome.".to_string())),
  }
}

#[instrument(
  name = "handler::view_cart",
  skip(app_state, path, auth),
  fields(account_id = %auth.actor.account_id)
)]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let prescription_id = path.into_inner();
  let ctx_data = ContextData::new(ViewCartCtxData::new(app_state.get_ref().clone(), auth.actor, prescription_id));

  app_state.registry.run(ctx_data.clone()).await?;

  let final_ctx = ctx_data.snapshot();
  match (final_ctx.view, final_ctx.detail) {
    (Some(CartView::Cart { order, entries, total_cents }), _) => {
      Ok(cart_view(&order, &entries, total_cents, prescription_id, Vec::new()))
    }
    (Some(CartView::Empty), Some(detail)) => Ok(prescription_view(&detail, vec![Flash::warning(EMPTY_CART)])),
    _ => Err(AppError::Internal("Cart view was not composed.".to_string())),
  }
}

#[instrument(name = "handler::checkout", skip(app_state, auth), fields(account_id = %auth.actor.account_id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth: Authorized<PatientOnly>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(app_state.get_ref().clone(), auth.actor));

  match app_state.registry.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let final_ctx = ctx_data.snapshot();
      let order = final_ctx
        .finalized
        .ok_or_else(|| AppError::Internal("Checkout completed without a finalized order.".to_string()))?;
      info!(order_id = %order.id, total_cents = final_ctx.total_cents, "Checkout completed.");
      let data = json!({
        "test_order": order,
        "test_carts": final_ctx.entries,
        "total_cents": final_ctx.total_cents,
        "currency": final_ctx.currency_code,
      });
      Ok(view::render("order-summary", vec![Flash::success("Your test order has been placed.")], data))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Checkout was halted.".to_string())),
  }
}
