// storefront/src/models/product.rs

use crate::pricing::Price;
use serde::{Deserialize, Serialize};

/// Display fields of a catalog product, copied into carts, wishlists and
/// orders so they survive later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
  pub name: String,
  pub price: i64,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub category: String,
  pub rating: Option<f64>,
}

/// Product fields as clients send them. The price may be a number or a
/// formatted string such as `"₹1,299"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
  pub name: String,
  pub price: Price,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub category: String,
  pub rating: Option<f64>,
}

impl ProductInput {
  pub fn snapshot(&self) -> ProductSnapshot {
    ProductSnapshot {
      name: self.name.trim().to_string(),
      price: self.price.amount(),
      image: self.image.clone(),
      category: self.category.clone(),
      rating: self.rating,
    }
  }
}
