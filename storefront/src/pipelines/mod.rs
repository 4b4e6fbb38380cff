// storefront/src/pipelines/mod.rs

//! The order workflows, expressed as `bazar_flow` flows and registered once
//! at startup.

use crate::errors::AppError;
use bazar_flow::Registry;

pub mod common_steps;
pub mod contexts;
pub mod factories;

pub mod create_order_pipeline;
pub mod settle_pipeline;
pub mod status_pipeline;

/// Registers every order flow with `registry`.
pub fn register_all(registry: &Registry<AppError>) {
  tracing::info!("Registering order flows...");

  create_order_pipeline::register_create_order_pipeline(registry);
  settle_pipeline::register_settle_pipeline(registry);
  status_pipeline::register_status_pipeline(registry);

  tracing::info!("All order flows registered.");
}
