// storefront/src/services/coupons.rs

use crate::errors::{AppError, Result};
use crate::models::coupon::{normalize_code, NewCoupon};
use crate::models::{Coupon, CouponRejection, DiscountType};
use crate::pricing;
use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A coupon that passed every check for a given amount and user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
  pub code: String,
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub discount: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCoupon {
  pub code: String,
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub max_discount: Option<i64>,
  pub min_order_amount: i64,
  pub valid_until: DateTime<Utc>,
  /// Discount for the supplied order amount, when one was given.
  pub potential_discount: Option<i64>,
  pub meets_minimum: Option<bool>,
}

#[derive(Clone)]
pub struct CouponService {
  store: Arc<dyn Store>,
}

impl CouponService {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  /// Store errors are `Err`; a coupon that does not apply is `Ok(Err(reason))`.
  async fn evaluate(
    &self,
    code: &str,
    order_amount: i64,
    user_id: Uuid,
  ) -> std::result::Result<std::result::Result<CouponQuote, CouponRejection>, StoreError> {
    let code = normalize_code(code);
    let Some(coupon) = self.store.coupon_by_code(&code).await? else {
      return Ok(Err(CouponRejection::NotFound));
    };
    Ok(coupon.check(order_amount, user_id, Utc::now()).map(|discount| CouponQuote {
      code: coupon.code.clone(),
      description: coupon.description.clone(),
      discount_type: coupon.discount_type,
      discount_value: coupon.discount_value,
      discount,
    }))
  }

  #[instrument(name = "CouponService::validate", skip(self), err(Display))]
  pub async fn validate(&self, code: &str, order_amount: i64, user_id: Uuid) -> Result<CouponQuote> {
    if code.trim().is_empty() {
      return Err(AppError::Validation("Coupon code is required".to_string()));
    }
    let order_amount = pricing::check_order_amount(order_amount)?;
    Ok(self.evaluate(code, order_amount, user_id).await??)
  }

  /// Like [`CouponService::validate`] but a coupon that does not apply is
  /// dropped with a warning instead of failing. Used when placing orders.
  pub async fn try_apply(&self, code: &str, order_amount: i64, user_id: Uuid) -> Result<Option<CouponQuote>> {
    match self.evaluate(code, order_amount, user_id).await? {
      Ok(quote) => Ok(Some(quote)),
      Err(reason) => {
        warn!(code = %normalize_code(code), %reason, "Coupon dropped from order.");
        Ok(None)
      }
    }
  }

  #[instrument(name = "CouponService::available_for", skip(self))]
  pub async fn available_for(&self, user_id: Uuid, order_amount: Option<i64>) -> Result<Vec<AvailableCoupon>> {
    let order_amount = order_amount.map(pricing::check_order_amount).transpose()?;
    let now = Utc::now();
    let list = self
      .store
      .active_coupons()
      .await?
      .into_iter()
      .filter(|c| c.is_valid(now) && c.can_user_use(user_id))
      .map(|c| AvailableCoupon {
        potential_discount: order_amount.map(|amount| c.calculate_discount(amount, now)),
        meets_minimum: order_amount.map(|amount| amount >= c.min_order_amount),
        code: c.code,
        description: c.description,
        discount_type: c.discount_type,
        discount_value: c.discount_value,
        max_discount: c.max_discount,
        min_order_amount: c.min_order_amount,
        valid_until: c.valid_until,
      })
      .collect::<Vec<_>>();
    debug!(count = list.len(), "Available coupons listed.");
    Ok(list)
  }

  #[instrument(name = "CouponService::create", skip(self, input), fields(code = %input.code), err(Display))]
  pub async fn create(&self, input: NewCoupon) -> Result<Coupon> {
    let code = normalize_code(&input.code);
    if code.is_empty() {
      return Err(AppError::Validation("Coupon code is required".to_string()));
    }
    if input.discount_value <= 0 {
      return Err(AppError::Validation("Discount value must be positive".to_string()));
    }
    if input.discount_type == DiscountType::Percentage && input.discount_value > 100 {
      return Err(AppError::Validation("Percentage discount cannot exceed 100".to_string()));
    }
    if input.min_order_amount < 0 || input.max_discount.is_some_and(|m| m <= 0) {
      return Err(AppError::Validation("Amounts must be positive".to_string()));
    }
    if input.usage_limit.is_some_and(|l| l <= 0) || input.user_usage_limit <= 0 {
      return Err(AppError::Validation("Usage limits must be positive".to_string()));
    }
    let now = Utc::now();
    let valid_from = input.valid_from.unwrap_or(now);
    if input.valid_until <= valid_from {
      return Err(AppError::Validation("validUntil must be after validFrom".to_string()));
    }

    let coupon = Coupon {
      id: Uuid::new_v4(),
      code,
      description: input.description.trim().to_string(),
      discount_type: input.discount_type,
      discount_value: input.discount_value,
      max_discount: match input.discount_type {
        DiscountType::Percentage => input.max_discount,
        DiscountType::Fixed => None,
      },
      min_order_amount: input.min_order_amount,
      usage_limit: input.usage_limit,
      usage_count: 0,
      user_usage_limit: input.user_usage_limit,
      valid_from,
      valid_until: input.valid_until,
      is_active: input.is_active,
      used_by: Vec::new(),
      created_at: now,
    };
    self.store.insert_coupon(&coupon).await.map_err(|e| match e {
      StoreError::Conflict(_) => AppError::Conflict("Coupon code already exists".to_string()),
      other => other.into(),
    })?;
    info!(code = %coupon.code, "Coupon created.");
    Ok(coupon)
  }
}
