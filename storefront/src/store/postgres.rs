// storefront/src/store/postgres.rs

//! Postgres-backed store. Orders are kept as a JSONB document next to the
//! columns used for lookups and filtering.

use super::{
  AddressRemoval, AddressStore, CartStore, CouponRedemption, CouponStore, OrderStore, Page, Paged, StoreError,
  StoreResult, UserStore, WishlistStore,
};
use crate::models::{
  Address, CartItem, Coupon, CouponUsage, DiscountType, Order, OrderStatus, ProductSnapshot, User, WishlistItem,
};
use crate::pricing::MAX_QUANTITY;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{event, instrument, Level};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "PgStore::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    event!(Level::INFO, "Connected to Postgres.");
    Ok(Self { pool })
  }

  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(&self.pool).await
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

/// Unique-key violations become `Conflict`, everything else stays a database error.
fn conflict_or_db(err: sqlx::Error, what: impl Into<String>) -> StoreError {
  match &err {
    sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what.into()),
    _ => StoreError::Database(err),
  }
}

/// Serializes address writes of one user for the rest of the transaction.
async fn lock_address_book(conn: &mut PgConnection, user_id: Uuid) -> StoreResult<()> {
  sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

async fn write_address(conn: &mut PgConnection, address: &Address) -> StoreResult<()> {
  if address.is_default {
    sqlx::query(
      "UPDATE addresses SET is_default = FALSE, updated_at = $3 \
       WHERE user_id = $1 AND id <> $2 AND is_default",
    )
    .bind(address.user_id)
    .bind(address.id)
    .bind(address.updated_at)
    .execute(&mut *conn)
    .await?;
  }
  sqlx::query(
    "INSERT INTO addresses (id, user_id, label, first_name, last_name, phone, street_address, city, state, \
       pincode, country, kind, is_default, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
     ON CONFLICT (id) DO UPDATE SET label = EXCLUDED.label, first_name = EXCLUDED.first_name, \
       last_name = EXCLUDED.last_name, phone = EXCLUDED.phone, street_address = EXCLUDED.street_address, \
       city = EXCLUDED.city, state = EXCLUDED.state, pincode = EXCLUDED.pincode, country = EXCLUDED.country, \
       kind = EXCLUDED.kind, is_default = EXCLUDED.is_default, updated_at = EXCLUDED.updated_at",
  )
  .bind(address.id)
  .bind(address.user_id)
  .bind(&address.label)
  .bind(&address.first_name)
  .bind(&address.last_name)
  .bind(&address.phone)
  .bind(&address.street_address)
  .bind(&address.city)
  .bind(&address.state)
  .bind(&address.pincode)
  .bind(&address.country)
  .bind(address.kind)
  .bind(address.is_default)
  .bind(address.created_at)
  .bind(address.updated_at)
  .execute(&mut *conn)
  .await
  .map_err(|e| conflict_or_db(e, "Another default address was saved at the same time"))?;
  Ok(())
}

#[derive(FromRow)]
struct CouponRow {
  id: Uuid,
  code: String,
  description: String,
  discount_type: DiscountType,
  discount_value: i64,
  max_discount: Option<i64>,
  min_order_amount: i64,
  usage_limit: Option<i64>,
  usage_count: i64,
  user_usage_limit: i64,
  valid_from: DateTime<Utc>,
  valid_until: DateTime<Utc>,
  is_active: bool,
  created_at: DateTime<Utc>,
}

impl CouponRow {
  fn into_coupon(self, used_by: Vec<CouponUsage>) -> Coupon {
    Coupon {
      id: self.id,
      code: self.code,
      description: self.description,
      discount_type: self.discount_type,
      discount_value: self.discount_value,
      max_discount: self.max_discount,
      min_order_amount: self.min_order_amount,
      usage_limit: self.usage_limit,
      usage_count: self.usage_count,
      user_usage_limit: self.user_usage_limit,
      valid_from: self.valid_from,
      valid_until: self.valid_until,
      is_active: self.is_active,
      used_by,
      created_at: self.created_at,
    }
  }
}

#[derive(FromRow)]
struct UsageRow {
  user_id: Uuid,
  order_id: Option<Uuid>,
  used_at: DateTime<Utc>,
  order_amount: i64,
  discount_amount: i64,
}

impl From<UsageRow> for CouponUsage {
  fn from(r: UsageRow) -> Self {
    CouponUsage {
      user_id: r.user_id,
      order_id: r.order_id,
      used_at: r.used_at,
      order_amount: r.order_amount,
      discount_amount: r.discount_amount,
    }
  }
}

#[derive(FromRow)]
struct CartRow {
  id: Uuid,
  user_id: Uuid,
  product: Json<ProductSnapshot>,
  quantity: i64,
  added_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
  fn from(r: CartRow) -> Self {
    CartItem {
      id: r.id,
      user_id: r.user_id,
      product: r.product.0,
      quantity: r.quantity,
      added_at: r.added_at,
      updated_at: r.updated_at,
    }
  }
}

#[derive(FromRow)]
struct WishlistRow {
  id: Uuid,
  user_id: Uuid,
  product: Json<ProductSnapshot>,
  added_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
  fn from(r: WishlistRow) -> Self {
    WishlistItem {
      id: r.id,
      user_id: r.user_id,
      product: r.product.0,
      added_at: r.added_at,
    }
  }
}

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, max_discount, min_order_amount, \
   usage_limit, usage_count, user_usage_limit, valid_from, valid_until, is_active, created_at";

const CART_COLUMNS: &str = "id, user_id, product, quantity, added_at, updated_at";

impl PgStore {
  async fn usages_for(&self, coupon_id: Uuid) -> StoreResult<Vec<CouponUsage>> {
    let rows: Vec<UsageRow> = sqlx::query_as(
      "SELECT user_id, order_id, used_at, order_amount, discount_amount FROM coupon_usages \
       WHERE coupon_id = $1 ORDER BY used_at",
    )
    .bind(coupon_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(CouponUsage::from).collect())
  }

  async fn fetch_orders(&self, where_sql: &str, bind: OrderFilter, page: Page) -> StoreResult<Paged<Order>> {
    let count_sql = format!("SELECT COUNT(*) FROM orders {}", where_sql);
    let data_sql = format!(
      "SELECT document FROM orders {} ORDER BY created_at DESC LIMIT {} OFFSET {}",
      where_sql,
      page.limit,
      page.offset()
    );

    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    let mut data_query = sqlx::query_as::<_, (Json<Order>,)>(&data_sql);
    match bind {
      OrderFilter::None => {}
      OrderFilter::User(id) => {
        count_query = count_query.bind(id);
        data_query = data_query.bind(id);
      }
      OrderFilter::Status(status) => {
        count_query = count_query.bind(status);
        data_query = data_query.bind(status);
      }
    }

    let (total,) = count_query.fetch_one(&self.pool).await?;
    let rows = data_query.fetch_all(&self.pool).await?;
    let items = rows.into_iter().map(|(doc,)| doc.0).collect();
    Ok(Paged::new(items, total.max(0) as u64, page))
  }
}

enum OrderFilter {
  None,
  User(Uuid),
  Status(OrderStatus),
}

#[async_trait]
impl UserStore for PgStore {
  async fn insert_user(&self, user: &User) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_or_db(e, format!("email {} already registered", user.email)))?;
    Ok(())
  }

  async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, name, email, password_hash, role, created_at, updated_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, name, email, password_hash, role, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }
}

#[async_trait]
impl AddressStore for PgStore {
  async fn addresses_for(&self, user_id: Uuid) -> StoreResult<Vec<Address>> {
    let list = sqlx::query_as::<_, Address>(
      "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(list)
  }

  async fn address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>> {
    let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
      .bind(id)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(address)
  }

  #[instrument(name = "PgStore::save_address", skip(self, address), fields(address_id = %address.id), err(Display))]
  async fn save_address(&self, address: &Address) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    lock_address_book(&mut tx, address.user_id).await?;
    write_address(&mut tx, address).await?;
    tx.commit().await?;
    Ok(())
  }

  #[instrument(name = "PgStore::insert_address", skip(self, address), fields(address_id = %address.id), err(Display))]
  async fn insert_address(&self, address: &Address) -> StoreResult<Address> {
    let mut tx = self.pool.begin().await?;
    lock_address_book(&mut tx, address.user_id).await?;
    let (others,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
      .bind(address.user_id)
      .fetch_one(&mut *tx)
      .await?;
    let mut address = address.clone();
    address.is_default = address.is_default || others == 0;
    write_address(&mut tx, &address).await?;
    tx.commit().await?;
    Ok(address)
  }

  #[instrument(name = "PgStore::delete_address", skip(self), err(Display))]
  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<AddressRemoval> {
    let mut tx = self.pool.begin().await?;
    lock_address_book(&mut tx, user_id).await?;
    let was_default: Option<(bool,)> =
      sqlx::query_as("DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some((was_default,)) = was_default else {
      return Err(StoreError::NotFound("Address".into()));
    };

    let mut promoted = None;
    if was_default {
      let next: Option<(Uuid,)> = sqlx::query_as(
        "UPDATE addresses SET is_default = TRUE, updated_at = now() WHERE id = ( \
           SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at ASC, id ASC LIMIT 1 \
         ) RETURNING id",
      )
      .bind(user_id)
      .fetch_optional(&mut *tx)
      .await?;
      promoted = next.map(|(id,)| id);
    }
    tx.commit().await?;
    Ok(AddressRemoval {
      removed: id,
      was_default,
      promoted,
    })
  }
}

#[async_trait]
impl CouponStore for PgStore {
  async fn coupon_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
    let sql = format!("SELECT {} FROM coupons WHERE code = $1", COUPON_COLUMNS);
    let row: Option<CouponRow> = sqlx::query_as(&sql).bind(code).fetch_optional(&self.pool).await?;
    match row {
      Some(row) => {
        let usages = self.usages_for(row.id).await?;
        Ok(Some(row.into_coupon(usages)))
      }
      None => Ok(None),
    }
  }

  async fn active_coupons(&self) -> StoreResult<Vec<Coupon>> {
    let sql = format!("SELECT {} FROM coupons WHERE is_active ORDER BY code", COUPON_COLUMNS);
    let rows: Vec<CouponRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
    let mut coupons = Vec::with_capacity(rows.len());
    for row in rows {
      let usages = self.usages_for(row.id).await?;
      coupons.push(row.into_coupon(usages));
    }
    Ok(coupons)
  }

  async fn insert_coupon(&self, coupon: &Coupon) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO coupons (id, code, description, discount_type, discount_value, max_discount, min_order_amount, \
         usage_limit, usage_count, user_usage_limit, valid_from, valid_until, is_active, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(coupon.id)
    .bind(&coupon.code)
    .bind(&coupon.description)
    .bind(coupon.discount_type)
    .bind(coupon.discount_value)
    .bind(coupon.max_discount)
    .bind(coupon.min_order_amount)
    .bind(coupon.usage_limit)
    .bind(coupon.usage_count)
    .bind(coupon.user_usage_limit)
    .bind(coupon.valid_from)
    .bind(coupon.valid_until)
    .bind(coupon.is_active)
    .bind(coupon.created_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_or_db(e, format!("coupon {} already exists", coupon.code)))?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO orders (id, user_id, order_number, status, document, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.order_number())
    .bind(order.status)
    .bind(Json(order))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_or_db(e, format!("order number {} taken", order.order_number())))?;
    Ok(())
  }

  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|(doc,)| doc.0))
  }

  async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
    let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE order_number = $1")
      .bind(order_number)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|(doc,)| doc.0))
  }

  async fn orders_for_user(&self, user_id: Uuid, page: Page) -> StoreResult<Paged<Order>> {
    self.fetch_orders("WHERE user_id = $1", OrderFilter::User(user_id), page).await
  }

  async fn all_orders(&self, status: Option<OrderStatus>, page: Page) -> StoreResult<Paged<Order>> {
    match status {
      Some(status) => self.fetch_orders("WHERE status = $1", OrderFilter::Status(status), page).await,
      None => self.fetch_orders("", OrderFilter::None, page).await,
    }
  }

  async fn update_order(&self, order: &Order) -> StoreResult<()> {
    let result = sqlx::query("UPDATE orders SET status = $2, document = $3, updated_at = $4 WHERE id = $1")
      .bind(order.id)
      .bind(order.status)
      .bind(Json(order))
      .bind(order.updated_at)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Order".into()));
    }
    Ok(())
  }

  #[instrument(name = "PgStore::confirm_order", skip(self, order, redemption), fields(order_id = %order.id), err(Display))]
  async fn confirm_order(&self, order: &Order, redemption: Option<&CouponRedemption>) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;

    let current: Option<(OrderStatus,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(order.id)
      .fetch_optional(&mut *tx)
      .await?;
    match current {
      Some((OrderStatus::Pending,)) => {}
      Some(_) => return Err(StoreError::Conflict(format!("order {} is no longer pending", order.id))),
      None => return Err(StoreError::NotFound("Order".into())),
    }

    sqlx::query("UPDATE orders SET status = $2, document = $3, updated_at = $4 WHERE id = $1")
      .bind(order.id)
      .bind(order.status)
      .bind(Json(order))
      .bind(order.updated_at)
      .execute(&mut *tx)
      .await?;

    if let Some(r) = redemption {
      let coupon: Option<(Uuid,)> =
        sqlx::query_as("UPDATE coupons SET usage_count = usage_count + 1 WHERE code = $1 RETURNING id")
          .bind(&r.code)
          .fetch_optional(&mut *tx)
          .await?;
      match coupon {
        Some((coupon_id,)) => {
          sqlx::query(
            "INSERT INTO coupon_usages (coupon_id, user_id, order_id, used_at, order_amount, discount_amount) \
             VALUES ($1, $2, $3, $4, $5, $6)",
          )
          .bind(coupon_id)
          .bind(r.usage.user_id)
          .bind(r.usage.order_id)
          .bind(r.usage.used_at)
          .bind(r.usage.order_amount)
          .bind(r.usage.discount_amount)
          .execute(&mut *tx)
          .await?;
        }
        None => event!(Level::WARN, code = %r.code, "Coupon vanished before confirmation; usage not recorded."),
      }
    }

    tx.commit().await?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
    let sql = format!("SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY added_at", CART_COLUMNS);
    let rows: Vec<CartRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;
    Ok(rows.into_iter().map(CartItem::from).collect())
  }

  async fn add_to_cart(&self, item: &CartItem) -> StoreResult<CartItem> {
    let sql = format!(
      "INSERT INTO cart_items (id, user_id, product_name, product, quantity, added_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) \
       ON CONFLICT (user_id, product_name) DO UPDATE \
         SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, {}), updated_at = EXCLUDED.updated_at \
       RETURNING {}",
      MAX_QUANTITY, CART_COLUMNS
    );
    let row: CartRow = sqlx::query_as(&sql)
      .bind(item.id)
      .bind(item.user_id)
      .bind(&item.product.name)
      .bind(Json(&item.product))
      .bind(item.quantity)
      .bind(item.added_at)
      .bind(item.updated_at)
      .fetch_one(&self.pool)
      .await?;
    Ok(row.into())
  }

  async fn set_cart_quantity(&self, user_id: Uuid, product_name: &str, quantity: i64) -> StoreResult<CartItem> {
    let sql = format!(
      "UPDATE cart_items SET quantity = $3, updated_at = now() WHERE user_id = $1 AND product_name = $2 RETURNING {}",
      CART_COLUMNS
    );
    let row: Option<CartRow> = sqlx::query_as(&sql)
      .bind(user_id)
      .bind(product_name)
      .bind(quantity)
      .fetch_optional(&self.pool)
      .await?;
    row.map(CartItem::from).ok_or_else(|| StoreError::NotFound("Cart item".into()))
  }

  async fn remove_from_cart(&self, user_id: Uuid, product_name: &str) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_name = $2")
      .bind(user_id)
      .bind(product_name)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Cart item".into()));
    }
    Ok(())
  }

  async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }
}

#[async_trait]
impl WishlistStore for PgStore {
  async fn wishlist_items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
    let rows: Vec<WishlistRow> = sqlx::query_as(
      "SELECT id, user_id, product, added_at FROM wishlist_items WHERE user_id = $1 ORDER BY added_at DESC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(WishlistItem::from).collect())
  }

  async fn add_to_wishlist(&self, item: &WishlistItem) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO wishlist_items (id, user_id, product_name, product, added_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(item.id)
    .bind(item.user_id)
    .bind(&item.product.name)
    .bind(Json(&item.product))
    .bind(item.added_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_or_db(e, "Product already in wishlist"))?;
    Ok(())
  }

  async fn remove_from_wishlist(&self, user_id: Uuid, product_name: &str) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_name = $2")
      .bind(user_id)
      .bind(product_name)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Wishlist item".into()));
    }
    Ok(())
  }
}
