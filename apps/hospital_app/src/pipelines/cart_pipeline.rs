// apps/hospital_app/src/pipelines/cart_pipeline.rs

//! Add, remove and view for the lab-test cart.
//!
//! Invariants kept by the store: one unpurchased line per (item, user), one
//! open order per user. The steps here only sequence store calls and record
//! what happened in the context.

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{
  AddToCartCtxData, CartView, RemoveFromCartCtxData, RemoveOutcome, ViewCartCtxData,
};
use tracing::{debug, info, instrument, warn};
use wardflow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};

pub fn register_cart_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  register_add_to_cart_pipeline(registry)?;
  register_remove_from_cart_pipeline(registry)?;
  register_view_cart_pipeline(registry)?;
  Ok(())
}

// --- AddToCart ---

fn register_add_to_cart_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("resolve_prescription_test", false, None),
    ("get_or_create_cart_line", false, None),
    ("get_or_create_open_order", false, None),
    ("attach_line_to_order", false, None),
  ]);

  p.on_root("resolve_prescription_test", resolve_prescription_test)?;
  p.on_root("get_or_create_cart_line", get_or_create_cart_line)?;
  p.on_root("get_or_create_open_order", get_or_create_open_order)?;
  p.on_root("attach_line_to_order", attach_line_to_order)?;

  registry.register_pipeline(p);
  Ok(())
}

#[instrument(name = "cart::resolve_prescription_test", skip_all, err(Display))]
async fn resolve_prescription_test(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, actor, prescription_id, test_info_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.actor, guard.prescription_id, guard.test_info_id)
  };
  common_steps::require_role(&actor, Role::Patient)?;

  common_steps::owned_prescription(store.as_ref(), &actor, prescription_id).await?;
  let item = store
    .find_prescription_test_for(prescription_id, test_info_id)
    .await?
    .ok_or_else(|| {
      warn!(%prescription_id, %test_info_id, "Test is not part of the prescription.");
      AppError::NotFound("This test is not part of the prescription.".to_string())
    })?;

  debug!(item_id = %item.id, test_name = %item.test_name, "Prescription test resolved.");
  ctx_data.write().item = Some(item);
  Ok(PipelineControl::Continue)
}

async fn get_or_create_cart_line(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, item_id) = {
    let guard = ctx_data.read();
    let item_id = guard
      .item
      .as_ref()
      .map(|i| i.id)
      .ok_or_else(|| AppError::Internal("Prescription test not resolved before cart line step.".to_string()))?;
    (guard.app_state.store.clone(), guard.actor.account_id, item_id)
  };

  let (line, created) = store.get_or_create_cart_line(item_id, user_id).await?;
  debug!(line_id = %line.id, created, "Cart line ready.");
  {
    let mut guard = ctx_data.write();
    guard.line = Some(line);
    guard.line_created = created;
  }
  Ok(PipelineControl::Continue)
}

async fn get_or_create_open_order(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.actor.account_id)
  };

  let (order, created) = store.get_or_create_open_order(user_id).await?;
  if created {
    info!(order_id = %order.id, %user_id, "Opened a new test order.");
  }
  {
    let mut guard = ctx_data.write();
    guard.order = Some(order);
    guard.order_created = created;
  }
  Ok(PipelineControl::Continue)
}

async fn attach_line_to_order(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, order_id, line_id) = {
    let guard = ctx_data.read();
    match (&guard.order, &guard.line) {
      (Some(order), Some(line)) => (guard.app_state.store.clone(), order.id, line.id),
      _ => {
        return Err(AppError::Internal(
          "Order and cart line must be resolved before attaching.".to_string(),
        ))
      }
    }
  };

  let attached = store.attach_line(order_id, line_id).await?;
  if attached {
    info!(%order_id, %line_id, "Test added to cart.");
  } else {
    debug!(%order_id, %line_id, "Test already in cart; nothing to do.");
  }
  ctx_data.write().newly_attached = attached;
  Ok(PipelineControl::Continue)
}

// --- RemoveFromCart ---

fn register_remove_from_cart_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<RemoveFromCartCtxData, AppError>::new(&[
    ("resolve_cart_item", false, None),
    ("load_open_order", false, None),
    ("check_cart_membership", false, None),
    ("detach_and_delete_line", false, None),
    ("load_remaining_entries", false, None),
  ]);

  p.on_root("resolve_cart_item", |ctx_data: ContextData<RemoveFromCartCtxData>| {
    Box::pin(async move {
      let (store, actor, item_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor, guard.item_id)
      };
      common_steps::require_role(&actor, Role::Patient)?;

      let item = store
        .find_prescription_test(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test {} not found.", item_id)))?;
      common_steps::owned_prescription(store.as_ref(), &actor, item.prescription_id).await?;
      ctx_data.write().item = Some(item);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("load_open_order", |ctx_data: ContextData<RemoveFromCartCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor.account_id)
      };

      match store.find_open_order(user_id).await? {
        Some(order) => {
          ctx_data.write().order = Some(order);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          info!(%user_id, "Remove requested without an open order.");
          ctx_data.write().outcome = Some(RemoveOutcome::NoOpenOrder);
          Ok(PipelineControl::Stop)
        }
      }
    })
  })?;

  p.on_root("check_cart_membership", |ctx_data: ContextData<RemoveFromCartCtxData>| {
    Box::pin(async move {
      let (store, user_id, item_id, order_id) = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| AppError::Internal("Open order not loaded before membership check.".to_string()))?;
        (guard.app_state.store.clone(), guard.actor.account_id, guard.item_id, order_id)
      };

      let line = store.find_open_cart_line(item_id, user_id).await?;
      let member = match &line {
        Some(line) => store.order_line_ids(order_id).await?.contains(&line.id),
        None => false,
      };
      if !member {
        info!(%item_id, %order_id, "Test was not in the cart.");
        ctx_data.write().outcome = Some(RemoveOutcome::NotInCart);
        return Ok::<_, AppError>(PipelineControl::Stop);
      }
      ctx_data.write().line = line;
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("detach_and_delete_line", |ctx_data: ContextData<RemoveFromCartCtxData>| {
    Box::pin(async move {
      let (store, order_id, line_id) = {
        let guard = ctx_data.read();
        match (&guard.order, &guard.line) {
          (Some(order), Some(line)) => (guard.app_state.store.clone(), order.id, line.id),
          _ => return Err(AppError::Internal("Nothing resolved to remove.".to_string())),
        }
      };

      store.remove_line(order_id, line_id).await?;
      info!(%order_id, %line_id, "Test removed from cart.");
      ctx_data.write().outcome = Some(RemoveOutcome::Removed);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("load_remaining_entries", |ctx_data: ContextData<RemoveFromCartCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.order.as_ref().map(|o| o.id))
      };
      if let Some(order_id) = order_id {
        let remaining = store.cart_entries(order_id).await?;
        ctx_data.write().remaining = remaining;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}

// --- ViewCart ---

fn register_view_cart_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<ViewCartCtxData, AppError>::new(&[
    ("load_prescription", false, None),
    ("load_unpurchased_lines", false, None),
    ("load_open_order", false, None),
    ("compose_cart_view", false, None),
  ]);

  p.on_root("load_prescription", |ctx_data: ContextData<ViewCartCtxData>| {
    Box::pin(async move {
      let (store, actor, prescription_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor, guard.prescription_id)
      };
      common_steps::require_role(&actor, Role::Patient)?;

      let prescription = common_steps::owned_prescription(store.as_ref(), &actor, prescription_id).await?;
      let detail = common_steps::prescription_detail(store.as_ref(), prescription).await?;
      ctx_data.write().detail = Some(detail);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("load_unpurchased_lines", |ctx_data: ContextData<ViewCartCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor.account_id)
      };
      let lines = store.unpurchased_lines(user_id).await?;
      ctx_data.write().unpurchased = lines;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("load_open_order", |ctx_data: ContextData<ViewCartCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor.account_id)
      };
      let order = store.find_open_order(user_id).await?;
      ctx_data.write().order = order;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("compose_cart_view", |ctx_data: ContextData<ViewCartCtxData>| {
    Box::pin(async move {
      let (store, order, has_lines) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.order.clone(), !guard.unpurchased.is_empty())
      };

      let view = match order {
        Some(order) if has_lines => {
          let entries = store.cart_entries(order.id).await?;
          let total_cents = entries.iter().map(|e| i64::from(e.price_cents)).sum();
          CartView::Cart {
            order,
            entries,
            total_cents,
          }
        }
        _ => CartView::Empty,
      };
      ctx_data.write().view = Some(view);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  Ok(())
}
