// storefront/src/web/mod.rs

pub mod extractors;
pub mod handlers;
pub mod routes;

use crate::errors::AppError;
use actix_web::web;

pub use extractors::{AdminUser, AuthenticatedUser};
pub use routes::configure_app_routes;

/// Malformed JSON bodies answer with the usual `{success: false}` shape.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
  web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

/// A path id that does not parse cannot name an existing resource.
pub fn path_config() -> web::PathConfig {
  web::PathConfig::default().error_handler(|_err, _req| AppError::NotFound("Resource not found".to_string()).into())
}
