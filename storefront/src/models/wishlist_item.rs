// storefront/src/models/wishlist_item.rs

use super::product::ProductSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
  pub id: Uuid,
  pub user_id: Uuid,
  #[serde(flatten)]
  pub product: ProductSnapshot,
  pub added_at: DateTime<Utc>,
}

impl WishlistItem {
  pub fn new(user_id: Uuid, product: ProductSnapshot) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      product,
      added_at: Utc::now(),
    }
  }
}
