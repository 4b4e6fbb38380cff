// storefront/src/errors.rs

use crate::models::{AddressError, CouponRejection};
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bazar_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(StoreError),

  #[error("Workflow Error: {0}")]
  Workflow(FlowError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Text placed in the `message` field of the response body. Server-side
  /// failures get a generic message; the detail only goes to the log.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Payment(m)
      | AppError::Config(m) => m.clone(),
      AppError::Store(_) => "Database operation failed".to_string(),
      AppError::Workflow(_) | AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
      StoreError::Conflict(m) => AppError::Conflict(m),
      other => AppError::Store(other),
    }
  }
}

impl From<FlowError> for AppError {
  fn from(err: FlowError) -> Self {
    AppError::Workflow(err)
  }
}

impl From<CouponRejection> for AppError {
  fn from(err: CouponRejection) -> Self {
    AppError::Validation(err.to_string())
  }
}

impl From<AddressError> for AppError {
  fn from(err: AddressError) -> Self {
    AppError::Validation(err.to_string())
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StoreError>() {
      Ok(store_err) => store_err.into(),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, "Responding with error");
    }
    HttpResponse::build(status).json(json!({ "success": false, "message": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_errors_map_to_http_statuses() {
    let not_found: AppError = StoreError::NotFound("Order".into()).into();
    assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
    let conflict: AppError = StoreError::Conflict("dup".into()).into();
    assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
  }

  #[test]
  fn server_errors_hide_detail() {
    let err = AppError::Internal("stack trace here".into());
    assert_eq!(err.public_message(), "An internal error occurred");
    let cfg = AppError::Config("PayPal is not configured. Please use Cash on Delivery.".into());
    assert!(cfg.public_message().contains("Cash on Delivery"));
  }

  #[test]
  fn coupon_rejections_are_client_errors() {
    let e: AppError = CouponRejection::Expired.into();
    assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    let e: AppError = CouponRejection::NotFound.into();
    assert_eq!(e.public_message(), "Invalid coupon code");
  }
}
