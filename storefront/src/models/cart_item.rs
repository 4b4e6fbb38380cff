// storefront/src/models/cart_item.rs

use super::product::ProductSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One cart line, unique per `(user_id, product.name)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  #[serde(flatten)]
  pub product: ProductSnapshot,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CartItem {
  pub fn new(user_id: Uuid, product: ProductSnapshot, quantity: i64) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      product,
      quantity,
      added_at: now,
      updated_at: now,
    }
  }

  pub fn line_total(&self) -> i64 {
    self.product.price.saturating_mul(self.quantity)
  }
}
