// storefront/src/services/tokens.rs

//! Signed bearer tokens: `base64url(claims) "." hex(hmac_sha256(base64url(claims)))`.
//!
//! The role travels inside the claims, so a token is decoded and verified
//! once and the caller dispatches on the role afterwards.

use crate::config::TokenConfig;
use crate::errors::{AppError, Result};
use crate::models::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub role: Role,
  pub iat: i64,
  pub exp: i64,
}

/// Who a verified token speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
  pub user_id: Uuid,
  pub role: Role,
}

impl Principal {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
  pub token: String,
  pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
  secret: SecretString,
  ttl: Duration,
}

impl TokenService {
  pub fn new(config: &TokenConfig) -> Self {
    Self {
      secret: config.secret.clone(),
      ttl: Duration::hours(config.ttl_hours),
    }
  }

  fn mac(&self) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
      .map_err(|e| AppError::Internal(format!("Token key rejected: {}", e)))
  }

  pub fn issue(&self, user_id: Uuid, role: Role) -> Result<IssuedToken> {
    self.issue_at(user_id, role, Utc::now())
  }

  pub fn issue_at(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<IssuedToken> {
    let expires_at = now + self.ttl;
    let claims = Claims {
      sub: user_id,
      role,
      iat: now.timestamp(),
      exp: expires_at.timestamp(),
    };
    let json = serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(IssuedToken {
      token: format!("{}.{}", payload, signature),
      expires_at,
    })
  }

  pub fn verify(&self, token: &str) -> Result<Principal> {
    self.verify_at(token, Utc::now())
  }

  #[instrument(name = "TokenService::verify", skip_all, err(Display))]
  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal> {
    let invalid = || AppError::Auth("Invalid or expired token".to_string());

    let (payload, signature) = token.trim().split_once('.').ok_or_else(invalid)?;
    let signature = hex::decode(signature).map_err(|_| invalid())?;
    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| invalid())?;

    let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| invalid())?;
    let expires = Utc.timestamp_opt(claims.exp, 0).single().ok_or_else(invalid)?;
    if expires <= now {
      debug!(user_id = %claims.sub, "Token expired.");
      return Err(invalid());
    }
    Ok(Principal {
      user_id: claims.sub,
      role: claims.role,
    })
  }
}
