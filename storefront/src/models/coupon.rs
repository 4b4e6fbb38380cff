// storefront/src/models/coupon.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "discount_type_enum", rename_all = "lowercase")]
pub enum DiscountType {
  Percentage,
  Fixed,
}

/// One redemption of a coupon, logged when the order it was applied to is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
  pub user_id: Uuid,
  pub order_id: Option<Uuid>,
  pub used_at: DateTime<Utc>,
  pub order_amount: i64,
  pub discount_amount: i64,
}

/// Why a coupon cannot be applied. The display text is what clients see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
  #[error("Invalid coupon code")]
  NotFound,
  #[error("Coupon is not yet valid")]
  NotYetValid,
  #[error("Coupon has expired")]
  Expired,
  #[error("Coupon usage limit has been reached")]
  Exhausted,
  #[error("You have already used this coupon")]
  AlreadyUsed,
  #[error("Minimum order amount of ₹{minimum} required for this coupon")]
  MinimumNotMet { minimum: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
  pub id: Uuid,
  pub code: String,
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  /// Cap on percentage discounts. Ignored for fixed coupons.
  pub max_discount: Option<i64>,
  pub min_order_amount: i64,
  /// Global redemption cap; `None` means unlimited.
  pub usage_limit: Option<i64>,
  pub usage_count: i64,
  pub user_usage_limit: i64,
  pub valid_from: DateTime<Utc>,
  pub valid_until: DateTime<Utc>,
  pub is_active: bool,
  #[serde(skip_serializing)]
  pub used_by: Vec<CouponUsage>,
  pub created_at: DateTime<Utc>,
}

/// Coupon codes are matched case-insensitively by upper-casing.
pub fn normalize_code(code: &str) -> String {
  code.trim().to_uppercase()
}

impl Coupon {
  pub fn in_window(&self, now: DateTime<Utc>) -> bool {
    self.valid_from <= now && now <= self.valid_until
  }

  pub fn is_exhausted(&self) -> bool {
    self.usage_limit.map_or(false, |limit| self.usage_count >= limit)
  }

  /// Active, inside its validity window, and not used up globally.
  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    self.is_active && self.in_window(now) && !self.is_exhausted()
  }

  pub fn user_usage_count(&self, user_id: Uuid) -> i64 {
    self.used_by.iter().filter(|u| u.user_id == user_id).count() as i64
  }

  pub fn can_user_use(&self, user_id: Uuid) -> bool {
    self.user_usage_count(user_id) < self.user_usage_limit
  }

  /// Discount for `order_amount`, or 0 when the coupon is invalid or the
  /// amount is below the minimum.
  pub fn calculate_discount(&self, order_amount: i64, now: DateTime<Utc>) -> i64 {
    if !self.is_valid(now) || order_amount < self.min_order_amount {
      return 0;
    }
    self.raw_discount(order_amount)
  }

  fn raw_discount(&self, order_amount: i64) -> i64 {
    let amount = order_amount.max(0);
    let discount = match self.discount_type {
      DiscountType::Percentage => {
        let discount = crate::pricing::percent_of(amount, self.discount_value);
        let capped = match self.max_discount {
          Some(cap) => discount.min(cap),
          None => discount,
        };
        capped.min(amount)
      }
      DiscountType::Fixed => self.discount_value.min(amount),
    };
    discount.max(0)
  }

  /// Full check in the order clients expect the reasons: window, global
  /// exhaustion, per-user usage, then minimum amount.
  pub fn check(&self, order_amount: i64, user_id: Uuid, now: DateTime<Utc>) -> Result<i64, CouponRejection> {
    if !self.is_active {
      return Err(CouponRejection::NotFound);
    }
    if now < self.valid_from {
      return Err(CouponRejection::NotYetValid);
    }
    if now > self.valid_until {
      return Err(CouponRejection::Expired);
    }
    if self.is_exhausted() {
      return Err(CouponRejection::Exhausted);
    }
    if !self.can_user_use(user_id) {
      return Err(CouponRejection::AlreadyUsed);
    }
    if order_amount < self.min_order_amount {
      return Err(CouponRejection::MinimumNotMet {
        minimum: self.min_order_amount,
      });
    }
    Ok(self.raw_discount(order_amount))
  }

  /// Bookkeeping applied on order confirmation.
  pub fn record_usage(&mut self, usage: CouponUsage) {
    self.usage_count += 1;
    self.used_by.push(usage);
  }
}

/// Admin input for a new coupon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
  pub code: String,
  #[serde(default)]
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub max_discount: Option<i64>,
  #[serde(default)]
  pub min_order_amount: i64,
  pub usage_limit: Option<i64>,
  #[serde(default = "default_user_usage_limit")]
  pub user_usage_limit: i64,
  pub valid_from: Option<DateTime<Utc>>,
  pub valid_until: DateTime<Utc>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_user_usage_limit() -> i64 {
  1
}

fn default_active() -> bool {
  true
}
