// storefront/src/store/memory.rs

//! In-process store used when no database is configured, and by tests.
//! Each method takes one lock, so multi-record updates are atomic.

use super::{
  sort_addresses, AddressRemoval, AddressStore, CartStore, CouponRedemption, CouponStore, OrderStore, Page, Paged,
  StoreError, StoreResult, UserStore, WishlistStore,
};
use crate::models::{Address, CartItem, Coupon, Order, OrderStatus, User, WishlistItem};
use crate::pricing::MAX_QUANTITY;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  addresses: HashMap<Uuid, Address>,
  coupons: HashMap<String, Coupon>,
  orders: HashMap<Uuid, Order>,
  cart: Vec<CartItem>,
  wishlist: Vec<WishlistItem>,
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn paginate(mut orders: Vec<Order>, page: Page) -> Paged<Order> {
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  let total = orders.len() as u64;
  let items = orders
    .into_iter()
    .skip(page.offset() as usize)
    .take(page.limit as usize)
    .collect();
  Paged::new(items, total, page)
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn insert_user(&self, user: &User) -> StoreResult<()> {
    let mut t = self.tables.write();
    if t.users.values().any(|u| u.email == user.email) {
      return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
    }
    t.users.insert(user.id, user.clone());
    Ok(())
  }

  async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.values().find(|u| u.email == email).cloned())
  }

  async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.get(&id).cloned())
  }
}

#[async_trait]
impl AddressStore for MemoryStore {
  async fn addresses_for(&self, user_id: Uuid) -> StoreResult<Vec<Address>> {
    let mut list: Vec<Address> = self
      .tables
      .read()
      .addresses
      .values()
      .filter(|a| a.user_id == user_id)
      .cloned()
      .collect();
    sort_addresses(&mut list);
    Ok(list)
  }

  async fn address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>> {
    Ok(self.tables.read().addresses.get(&id).filter(|a| a.user_id == user_id).cloned())
  }

  async fn save_address(&self, address: &Address) -> StoreResult<()> {
    let mut t = self.tables.write();
    if address.is_default {
      for other in t.addresses.values_mut() {
        if other.user_id == address.user_id && other.id != address.id && other.is_default {
          other.is_default = false;
          other.updated_at = address.updated_at;
        }
      }
    }
    t.addresses.insert(address.id, address.clone());
    Ok(())
  }

  async fn insert_address(&self, address: &Address) -> StoreResult<Address> {
    let mut t = self.tables.write();
    let first = !t.addresses.values().any(|a| a.user_id == address.user_id);
    let mut address = address.clone();
    address.is_default = address.is_default || first;
    if address.is_default {
      for other in t.addresses.values_mut().filter(|a| a.user_id == address.user_id) {
        other.is_default = false;
        other.updated_at = address.updated_at;
      }
    }
    t.addresses.insert(address.id, address.clone());
    Ok(address)
  }

  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<AddressRemoval> {
    let mut t = self.tables.write();
    let removed = match t.addresses.get(&id) {
      Some(a) if a.user_id == user_id => a.clone(),
      _ => return Err(StoreError::NotFound("Address".into())),
    };
    t.addresses.remove(&id);

    let mut promoted = None;
    if removed.is_default {
      let oldest = t
        .addresses
        .values_mut()
        .filter(|a| a.user_id == user_id)
        .min_by_key(|a| (a.created_at, a.id));
      if let Some(next) = oldest {
        next.is_default = true;
        next.updated_at = Utc::now();
        promoted = Some(next.id);
      }
    }
    Ok(AddressRemoval {
      removed: id,
      was_default: removed.is_default,
      promoted,
    })
  }
}

#[async_trait]
impl CouponStore for MemoryStore {
  async fn coupon_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
    Ok(self.tables.read().coupons.get(code).cloned())
  }

  async fn active_coupons(&self) -> StoreResult<Vec<Coupon>> {
    let mut list: Vec<Coupon> = self.tables.read().coupons.values().filter(|c| c.is_active).cloned().collect();
    list.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(list)
  }

  async fn insert_coupon(&self, coupon: &Coupon) -> StoreResult<()> {
    let mut t = self.tables.write();
    if t.coupons.contains_key(&coupon.code) {
      return Err(StoreError::Conflict(format!("coupon {} already exists", coupon.code)));
    }
    t.coupons.insert(coupon.code.clone(), coupon.clone());
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let mut t = self.tables.write();
    if t.orders.values().any(|o| o.order_number() == order.order_number()) {
      return Err(StoreError::Conflict(format!("order number {} taken", order.order_number())));
    }
    t.orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.tables.read().orders.get(&id).cloned())
  }

  async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
    Ok(self.tables.read().orders.values().find(|o| o.order_number() == order_number).cloned())
  }

  async fn orders_for_user(&self, user_id: Uuid, page: Page) -> StoreResult<Paged<Order>> {
    let orders = self.tables.read().orders.values().filter(|o| o.user_id == user_id).cloned().collect();
    Ok(paginate(orders, page))
  }

  async fn all_orders(&self, status: Option<OrderStatus>, page: Page) -> StoreResult<Paged<Order>> {
    let orders = self
      .tables
      .read()
      .orders
      .values()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .cloned()
      .collect();
    Ok(paginate(orders, page))
  }

  async fn update_order(&self, order: &Order) -> StoreResult<()> {
    let mut t = self.tables.write();
    match t.orders.get_mut(&order.id) {
      Some(existing) => {
        *existing = order.clone();
        Ok(())
      }
      None => Err(StoreError::NotFound("Order".into())),
    }
  }

  async fn confirm_order(&self, order: &Order, redemption: Option<&CouponRedemption>) -> StoreResult<()> {
    let mut t = self.tables.write();
    match t.orders.get(&order.id) {
      Some(existing) if existing.status == OrderStatus::Pending => {}
      Some(_) => return Err(StoreError::Conflict(format!("order {} is no longer pending", order.id))),
      None => return Err(StoreError::NotFound("Order".into())),
    }
    if let Some(r) = redemption {
      match t.coupons.get_mut(&r.code) {
        Some(coupon) => coupon.record_usage(r.usage.clone()),
        None => tracing::warn!(code = %r.code, "Coupon vanished before confirmation; usage not recorded."),
      }
    }
    t.orders.insert(order.id, order.clone());
    Ok(())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
    let mut items: Vec<CartItem> = self.tables.read().cart.iter().filter(|i| i.user_id == user_id).cloned().collect();
    items.sort_by(|a, b| a.added_at.cmp(&b.added_at));
    Ok(items)
  }

  async fn add_to_cart(&self, item: &CartItem) -> StoreResult<CartItem> {
    let mut t = self.tables.write();
    if let Some(existing) = t
      .cart
      .iter_mut()
      .find(|i| i.user_id == item.user_id && i.product.name == item.product.name)
    {
      existing.quantity = existing.quantity.saturating_add(item.quantity).min(MAX_QUANTITY);
      existing.updated_at = Utc::now();
      return Ok(existing.clone());
    }
    t.cart.push(item.clone());
    Ok(item.clone())
  }

  async fn set_cart_quantity(&self, user_id: Uuid, product_name: &str, quantity: i64) -> StoreResult<CartItem> {
    let mut t = self.tables.write();
    let line = t
      .cart
      .iter_mut()
      .find(|i| i.user_id == user_id && i.product.name == product_name)
      .ok_or_else(|| StoreError::NotFound("Cart item".into()))?;
    line.quantity = quantity;
    line.updated_at = Utc::now();
    Ok(line.clone())
  }

  async fn remove_from_cart(&self, user_id: Uuid, product_name: &str) -> StoreResult<()> {
    let mut t = self.tables.write();
    let before = t.cart.len();
    t.cart.retain(|i| !(i.user_id == user_id && i.product.name == product_name));
    if t.cart.len() == before {
      return Err(StoreError::NotFound("Cart item".into()));
    }
    Ok(())
  }

  async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64> {
    let mut t = self.tables.write();
    let before = t.cart.len();
    t.cart.retain(|i| i.user_id != user_id);
    Ok((before - t.cart.len()) as u64)
  }
}

#[async_trait]
impl WishlistStore for MemoryStore {
  async fn wishlist_items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
    let mut items: Vec<WishlistItem> =
      self.tables.read().wishlist.iter().filter(|i| i.user_id == user_id).cloned().collect();
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    Ok(items)
  }

  async fn add_to_wishlist(&self, item: &WishlistItem) -> StoreResult<()> {
    let mut t = self.tables.write();
    if t
      .wishlist
      .iter()
      .any(|i| i.user_id == item.user_id && i.product.name == item.product.name)
    {
      return Err(StoreError::Conflict("Product already in wishlist".into()));
    }
    t.wishlist.push(item.clone());
    Ok(())
  }

  async fn remove_from_wishlist(&self, user_id: Uuid, product_name: &str) -> StoreResult<()> {
    let mut t = self.tables.write();
    let before = t.wishlist.len();
    t.wishlist.retain(|i| !(i.user_id == user_id && i.product.name == product_name));
    if t.wishlist.len() == before {
      return Err(StoreError::NotFound("Wishlist item".into()));
    }
    Ok(())
  }
}
