// apps/hospital_app/src/services/payment_mock.rs
use crate::errors::{AppError, Result as AppResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{info, instrument};
use uuid::Uuid;

/// Charges on file, keyed by the order they pay for.
static CHARGES: LazyLock<Mutex<HashMap<Uuid, MockCharge>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeStatus {
  RequiresAction,
  Succeeded,
  Failed,
}

#[derive(Debug, Clone)]
pub struct MockCharge {
  pub id: String,
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub status: ChargeStatus,
  pub account_id_used: String,
}

/// The order id is the idempotency key: asking again for the same order and
/// amount returns the charge already on file unless it was declined.
#[instrument(skip(account_id), fields(order_id = %order_id, amount_cents, payment_account_id = %account_id))]
pub async fn create_mock_charge(
  order_id: Uuid,
  amount_cents: i64,
  currency: &str,
  account_id: &str,
) -> AppResult<MockCharge> {
  info!("Simulating creation of lab-order charge.");
  if amount_cents <= 0 {
    return Err(AppError::Payment("Amount must be greater than zero".to_string()));
  }

  let charge = {
    let mut ledger = CHARGES.lock();
    match ledger.get(&order_id) {
      Some(existing) if existing.status != ChargeStatus::Failed && existing.amount_cents == amount_cents => {
        info!(charge_id = %existing.id, "Charge already on file for this order.");
        existing.clone()
      }
      _ => {
        let charge = MockCharge {
          id: format!("mock_ch_{}", Uuid::new_v4()),
          order_id,
          amount_cents,
          currency: currency.to_string(),
          status: ChargeStatus::RequiresAction,
          account_id_used: account_id.to_string(),
        };
        ledger.insert(order_id, charge.clone());
        charge
      }
    }
  };
  tokio::time::sleep(std::time::Duration::from_millis(20)).await;
  Ok(charge)
}

/// Amounts ending in 123 (in cents, modulo 1000) are declined. A charge that
/// already succeeded is not taken again.
#[instrument(skip(charge), fields(charge_id = %charge.id))]
pub async fn confirm_mock_charge(charge: &mut MockCharge) -> AppResult<()> {
  let settled = CHARGES
    .lock()
    .get(&charge.order_id)
    .is_some_and(|c| c.id == charge.id && c.status == ChargeStatus::Succeeded);
  if settled {
    charge.status = ChargeStatus::Succeeded;
    info!("Mock charge already settled.");
    return Ok(());
  }

  tokio::time::sleep(std::time::Duration::from_millis(20)).await;

  let result = if charge.amount_cents % 1000 == 123 {
    charge.status = ChargeStatus::Failed;
    info!("Mock charge FAILED.");
    Err(AppError::Payment("Mock payment failed due to test condition".to_string()))
  } else {
    charge.status = ChargeStatus::Succeeded;
    info!("Mock charge SUCCEEDED.");
    Ok(())
  };
  CHARGES.lock().insert(charge.order_id, charge.clone());
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn charge_lifecycle() {
    let mut charge = create_mock_charge(Uuid::new_v4(), 2500, "bdt", "acct").await.unwrap();
    assert_eq!(charge.status, ChargeStatus::RequiresAction);
    confirm_mock_charge(&mut charge).await.unwrap();
    assert_eq!(charge.status, ChargeStatus::Succeeded);
  }

  #[tokio::test]
  async fn zero_amount_and_declines() {
    assert!(matches!(
      create_mock_charge(Uuid::new_v4(), 0, "bdt", "acct").await,
      Err(AppError::Payment(_))
    ));
    let mut charge = create_mock_charge(Uuid::new_v4(), 1123, "bdt", "acct").await.unwrap();
    assert!(confirm_mock_charge(&mut charge).await.is_err());
    assert_eq!(charge.status, ChargeStatus::Failed);
  }

  #[tokio::test]
  async fn one_charge_per_order() {
    let order_id = Uuid::new_v4();
    let mut first = create_mock_charge(order_id, 2500, "bdt", "acct").await.unwrap();
    let mut again = create_mock_charge(order_id, 2500, "bdt", "acct").await.unwrap();
    assert_eq!(first.id, again.id);

    confirm_mock_charge(&mut first).await.unwrap();
    confirm_mock_charge(&mut again).await.unwrap();
    assert_eq!(again.status, ChargeStatus::Succeeded);

    let after = create_mock_charge(order_id, 2500, "bdt", "acct").await.unwrap();
    assert_eq!(after.id, first.id);
    let other_order = create_mock_charge(Uuid::new_v4(), 2500, "bdt", "acct").await.unwrap();
    assert_ne!(other_order.id, first.id);
  }

  #[tokio::test]
  async fn a_declined_charge_is_not_reused() {
    let order_id = Uuid::new_v4();
    let mut declined = create_mock_charge(order_id, 1123, "bdt", "acct").await.unwrap();
    assert!(confirm_mock_charge(&mut declined).await.is_err());
    let retry = create_mock_charge(order_id, 1123, "bdt", "acct").await.unwrap();
    assert_ne!(retry.id, declined.id);
  }
}
