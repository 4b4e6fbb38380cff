// storefront/src/store/mod.rs

//! Persistence seams. Services talk to these traits; `PgStore` and
//! `MemoryStore` implement them.

pub mod memory;
pub mod postgres;

use crate::models::{Address, CartItem, Coupon, CouponUsage, Order, OrderStatus, User, WishlistItem};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0} not found")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page: u32,
  pub limit: u32,
}

impl Page {
  /// Clamps page to at least 1 and limit to `1..=MAX_PAGE_SIZE`.
  pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
    Self {
      page: page.unwrap_or(1).max(1),
      limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub fn offset(&self) -> u64 {
    (self.page as u64 - 1) * self.limit as u64
  }
}

impl Default for Page {
  fn default() -> Self {
    Self::new(None, None)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u32,
  pub limit: u32,
  pub total_pages: u64,
}

impl<T> Paged<T> {
  pub fn new(items: Vec<T>, total: u64, page: Page) -> Self {
    let limit = page.limit as u64;
    Self {
      items,
      total,
      page: page.page,
      limit: page.limit,
      total_pages: total.div_ceil(limit),
    }
  }
}

/// Outcome of deleting an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRemoval {
  pub removed: Uuid,
  pub was_default: bool,
  /// Address promoted to default because the removed one was the default.
  pub promoted: Option<Uuid>,
}

/// Coupon bookkeeping to apply together with an order confirmation.
#[derive(Debug, Clone)]
pub struct CouponRedemption {
  pub code: String,
  pub usage: CouponUsage,
}

#[async_trait]
pub trait UserStore: Send + Sync {
  /// `Conflict` when the email is taken.
  async fn insert_user(&self, user: &User) -> StoreResult<()>;
  async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
  async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
  /// Default first, then newest first.
  async fn addresses_for(&self, user_id: Uuid) -> StoreResult<Vec<Address>>;
  async fn address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>>;
  /// Inserts or replaces `address`. When it is the default, every other
  /// address of the same user loses the flag in the same write.
  async fn save_address(&self, address: &Address) -> StoreResult<()>;
  /// Inserts a new address. It is stored as the default when flagged so or
  /// when the user has no address yet, decided inside the write.
  async fn insert_address(&self, address: &Address) -> StoreResult<Address>;
  /// Removes the address; if it was the default, the oldest remaining
  /// address becomes the default in the same write.
  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<AddressRemoval>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
  /// Lookup by already-normalized code, regardless of `is_active`.
  async fn coupon_by_code(&self, code: &str) -> StoreResult<Option<Coupon>>;
  async fn active_coupons(&self) -> StoreResult<Vec<Coupon>>;
  /// `Conflict` when the code exists.
  async fn insert_coupon(&self, coupon: &Coupon) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// `Conflict` when the order number is already taken.
  async fn insert_order(&self, order: &Order) -> StoreResult<()>;
  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;
  async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;
  /// Newest first.
  async fn orders_for_user(&self, user_id: Uuid, page: Page) -> StoreResult<Paged<Order>>;
  async fn all_orders(&self, status: Option<OrderStatus>, page: Page) -> StoreResult<Paged<Order>>;
  /// Last writer wins.
  async fn update_order(&self, order: &Order) -> StoreResult<()>;
  /// Writes the confirmed `order` and, when given, the coupon redemption as
  /// one unit. Fails with `Conflict` if the stored order is no longer pending,
  /// so a payment can only be counted once.
  async fn confirm_order(&self, order: &Order, redemption: Option<&CouponRedemption>) -> StoreResult<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>>;
  /// Adds `item.quantity` to an existing line with the same product name, or inserts it.
  async fn add_to_cart(&self, item: &CartItem) -> StoreResult<CartItem>;
  async fn set_cart_quantity(&self, user_id: Uuid, product_name: &str, quantity: i64) -> StoreResult<CartItem>;
  async fn remove_from_cart(&self, user_id: Uuid, product_name: &str) -> StoreResult<()>;
  /// Returns how many lines were removed.
  async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait WishlistStore: Send + Sync {
  async fn wishlist_items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>>;
  /// `Conflict` when the product is already on the list.
  async fn add_to_wishlist(&self, item: &WishlistItem) -> StoreResult<()>;
  async fn remove_from_wishlist(&self, user_id: Uuid, product_name: &str) -> StoreResult<()>;
}

/// Everything the application persists.
pub trait Store: UserStore + AddressStore + CouponStore + OrderStore + CartStore + WishlistStore {}

impl<S> Store for S where S: UserStore + AddressStore + CouponStore + OrderStore + CartStore + WishlistStore {}

/// Default address first, then newest.
pub(crate) fn sort_addresses(addresses: &mut [Address]) {
  addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(b.created_at.cmp(&a.created_at)));
}
