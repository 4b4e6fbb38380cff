// storefront/src/config.rs

use crate::errors::{AppError, Result};
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

/// PayPal credentials and the rate used to convert base-currency totals.
#[derive(Clone)]
pub struct PaypalConfig {
  pub client_id: String,
  pub client_secret: SecretString,
  pub currency: String,
  pub conversion_rate: Decimal,
}

impl std::fmt::Debug for PaypalConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaypalConfig")
      .field("client_id", &self.client_id)
      .field("client_secret", &"[REDACTED]")
      .field("currency", &self.currency)
      .field("conversion_rate", &self.conversion_rate)
      .finish()
  }
}

#[derive(Clone)]
pub struct TokenConfig {
  pub secret: SecretString,
  pub ttl_hours: i64,
}

impl std::fmt::Debug for TokenConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenConfig")
      .field("secret", &"[REDACTED]")
      .field("ttl_hours", &self.ttl_hours)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<SecretString>,
  pub frontend_url: String,
  pub tokens: TokenConfig,
  /// `None` when either PayPal credential is missing.
  pub paypal: Option<PaypalConfig>,
  pub mail_sender: String,
  pub seed_db: bool,
  pub admin_email: Option<String>,
  pub admin_password: Option<SecretString>,
  pub log_format: LogFormat,
}

fn parse_var<T>(name: &str, raw: Option<String>, default: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  let value = raw.unwrap_or_else(|| default.to_string());
  value
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port: u16 = parse_var("SERVER_PORT", get("SERVER_PORT"), "8080")?;
    let database_url = get("DATABASE_URL").map(SecretString::from);
    let frontend_url = get("FRONTEND_URL")
      .unwrap_or_else(|| "http://localhost:5173".to_string())
      .trim_end_matches('/')
      .to_string();

    let secret = get("TOKEN_SECRET")
      .ok_or_else(|| AppError::Config("Missing environment variable 'TOKEN_SECRET'".to_string()))?;
    let ttl_hours: i64 = parse_var("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), "168")?;
    if ttl_hours <= 0 {
      return Err(AppError::Config("TOKEN_TTL_HOURS must be positive".to_string()));
    }
    let tokens = TokenConfig {
      secret: SecretString::from(secret),
      ttl_hours,
    };

    let paypal = match (get("PAYPAL_CLIENT_ID"), get("PAYPAL_CLIENT_SECRET")) {
      (Some(client_id), Some(client_secret)) => {
        let conversion_rate: Decimal =
          parse_var("PAYPAL_CONVERSION_RATE", get("PAYPAL_CONVERSION_RATE"), "0.012")?;
        if conversion_rate <= Decimal::ZERO {
          return Err(AppError::Config("PAYPAL_CONVERSION_RATE must be positive".to_string()));
        }
        Some(PaypalConfig {
          client_id,
          client_secret: SecretString::from(client_secret),
          currency: get("PAYPAL_CURRENCY").unwrap_or_else(|| "USD".to_string()).to_uppercase(),
          conversion_rate,
        })
      }
      _ => None,
    };

    let mail_sender = get("MAIL_SENDER").unwrap_or_else(|| "noreply@intellibazar.in".to_string());
    let seed_db: bool = parse_var("SEED_DB", get("SEED_DB"), "false")?;
    let admin_email = get("ADMIN_EMAIL").map(|e| e.trim().to_lowercase());
    let admin_password = get("ADMIN_PASSWORD").map(SecretString::from);

    let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      frontend_url,
      tokens,
      paypal,
      mail_sender,
      seed_db,
      admin_email,
      admin_password,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
