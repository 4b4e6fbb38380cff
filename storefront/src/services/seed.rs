// storefront/src/services/seed.rs

//! Startup seeding: demo coupons and the configured admin account.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::coupon::NewCoupon;
use crate::models::DiscountType;
use crate::services::{AuthService, CouponService};
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

/// Coupons created by the seed. `SAVE50` is the fixed example used in the
/// storefront copy; `WELCOME10` a capped percentage one.
pub fn demo_coupons() -> Vec<NewCoupon> {
  let until = Utc::now() + Duration::days(365);
  vec![
    NewCoupon {
      code: "SAVE50".to_string(),
      description: "Flat 50 off on orders above 1000".to_string(),
      discount_type: DiscountType::Fixed,
      discount_value: 50,
      max_discount: None,
      min_order_amount: 1000,
      usage_limit: None,
      user_usage_limit: 1,
      valid_from: None,
      valid_until: until,
      is_active: true,
    },
    NewCoupon {
      code: "WELCOME10".to_string(),
      description: "10% off your order, up to 200".to_string(),
      discount_type: DiscountType::Percentage,
      discount_value: 10,
      max_discount: Some(200),
      min_order_amount: 500,
      usage_limit: Some(1000),
      user_usage_limit: 1,
      valid_from: None,
      valid_until: until,
      is_active: true,
    },
  ]
}

/// Creates the demo coupons (skipping ones that exist) and the admin
/// account when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
#[instrument(name = "seed::run", skip_all, err(Display))]
pub async fn run(config: &AppConfig, auth: &AuthService, coupons: &CouponService) -> Result<()> {
  let mut created = 0;
  for coupon in demo_coupons() {
    let code = coupon.code.clone();
    match coupons.create(coupon).await {
      Ok(_) => created += 1,
      Err(AppError::Conflict(_)) => info!(%code, "Demo coupon already present."),
      Err(e) => return Err(e),
    }
  }
  info!(created, "Demo coupons seeded.");

  match (&config.admin_email, &config.admin_password) {
    (Some(email), Some(password)) => {
      let admin = auth.ensure_admin("Administrator", email, password.expose_secret()).await?;
      info!(admin_id = %admin.id, "Admin account ready.");
    }
    _ => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no admin account seeded."),
  }
  Ok(())
}
