// apps/hospital_app/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A pending purchase of one prescription test by one user.
/// At most one unpurchased line exists per `(item_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CartLine {
  pub id: Uuid,
  /// `PrescriptionTest` id.
  pub item_id: Uuid,
  pub user_id: Uuid,
  pub purchased: bool,
  pub created_at: DateTime<Utc>,
}

/// At most one order per user has `ordered = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TestOrder {
  pub id: Uuid,
  pub user_id: Uuid,
  pub ordered: bool,
  pub ordered_at: Option<DateTime<Utc>>,
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// A cart line joined with what it buys, for the cart view and checkout.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartEntry {
  pub line_id: Uuid,
  pub item_id: Uuid,
  pub prescription_id: Uuid,
  pub test_name: String,
  pub price_cents: i32,
}
