// apps/hospital_app/src/pipelines/checkout_pipeline.rs

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::payment_mock;
use tracing::{error, info, instrument, warn};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

const EMPTY_CART: &str = "You don't have any test in your cart!";

pub fn register_checkout_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("load_open_order_checkout", false, None),
    ("load_cart_entries_checkout", false, None),
    ("calculate_total_checkout", false, None),
    ("charge_payment_checkout", false, None),
    ("finalize_order_checkout", false, None),
  ]);

  p.on_root("load_open_order_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, actor) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor)
      };
      common_steps::require_role(&actor, Role::Patient)?;

      let order = store.find_open_order(actor.account_id).await?.ok_or_else(|| {
        warn!(account_id = %actor.account_id, "Checkout without an open order.");
        AppError::Validation(EMPTY_CART.to_string())
      })?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("load_cart_entries_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| AppError::Internal("Order not loaded before entries.".to_string()))?;
        (guard.app_state.store.clone(), order_id)
      };

      let entries = store.cart_entries(order_id).await?;
      if entries.is_empty() {
        return Err(AppError::Validation(EMPTY_CART.to_string()));
      }
      ctx_data.write().entries = entries;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("calculate_total_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let total: i64 = guard.entries.iter().map(|e| i64::from(e.price_cents)).sum();
      guard.total_cents = total;
      info!(total_cents = total, lines = guard.entries.len(), "Cart total calculated.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("charge_payment_checkout", charge_payment)?;

  p.on_root("finalize_order_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, account_id, order_id, reference) = {
        let guard = ctx_data.read();
        match (&guard.order, &guard.charge) {
          (Some(order), Some(charge)) => (
            guard.app_state.store.clone(),
            guard.actor.account_id,
            order.id,
            charge.id.clone(),
          ),
          _ => return Err(AppError::Internal("Order cannot be finalized before payment.".to_string())),
        }
      };

      let finalized = match store.finalize_order(order_id, &reference).await {
        Ok(order) => order,
        Err(AppError::NotFound(reason)) => {
          // A concurrent checkout of the same order may have closed it with this very charge.
          let closed = store
            .orders_for_user(account_id)
            .await?
            .into_iter()
            .find(|o| o.id == order_id && o.ordered && o.payment_reference.as_deref() == Some(reference.as_str()));
          match closed {
            Some(order) => {
              info!(%order_id, "Order was already finalized with this charge.");
              order
            }
            None => {
              error!(%order_id, payment_reference = %reference, %reason, "Payment taken but order not finalized.");
              return Err(AppError::NotFound(reason));
            }
          }
        }
        Err(e) => {
          error!(%order_id, payment_reference = %reference, error = %e, "Payment taken but order not finalized.");
          return Err(e);
        }
      };
      info!(%order_id, "Test order finalized.");
      ctx_data.write().finalized = Some(finalized);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}

#[instrument(name = "checkout::charge_payment", skip_all, err(Display))]
async fn charge_payment(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (order_id, amount_cents, currency, account_id) = {
    let guard = ctx_data.read();
    let order_id = guard
      .order
      .as_ref()
      .map(|o| o.id)
      .ok_or_else(|| AppError::Internal("Order not loaded before payment.".to_string()))?;
    (
      order_id,
      guard.total_cents,
      guard.currency_code.clone(),
      guard.app_state.config.mock_payment_account_id.clone(),
    )
  };

  let mut charge = payment_mock::create_mock_charge(order_id, amount_cents, &currency, &account_id).await?;
  payment_mock::confirm_mock_charge(&mut charge).await?;
  ctx_data.write().charge = Some(charge);
  Ok(PipelineControl::Continue)
}
