// tests/common/mod.rs
#![allow(dead_code)]

use bazar_flow::{Control, FlowData, FlowError, Handler};
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

/// Root context used across engine tests: a running tally plus a log of
/// the stages that touched it.
#[derive(Clone, Debug, Default)]
pub struct Tally {
  pub total: i64,
  pub visited: Vec<String>,
  pub halt_at: Option<String>,
  pub channel: String,
  pub gateway: FlowData<GatewayLeg>,
  pub offline: FlowData<OfflineLeg>,
}

#[derive(Clone, Debug, Default)]
pub struct GatewayLeg {
  pub amount: i64,
  pub reference: String,
  pub captured: bool,
}

#[derive(Clone, Debug, Default)]
pub struct OfflineLeg {
  pub amount: i64,
  pub note: String,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TallyError {
  #[error("engine: {0}")]
  Engine(String),

  #[error("stage failed: {0}")]
  Stage(String),
}

impl From<FlowError> for TallyError {
  fn from(e: FlowError) -> Self {
    TallyError::Engine(format!("{:?}", e))
  }
}

/// Adds `amount` to the tally and records the stage.
pub fn add(stage: &'static str, amount: i64) -> Handler<Tally, TallyError> {
  Box::new(move |data: FlowData<Tally>| {
    Box::pin(async move {
      let mut t = data.write();
      t.total += amount;
      t.visited.push(stage.to_string());
      if t.halt_at.as_deref() == Some(stage) {
        return Ok(Control::Halt);
      }
      Ok(Control::Continue)
    })
  })
}

pub fn fail(stage: &'static str, message: &'static str) -> Handler<Tally, TallyError> {
  Box::new(move |data: FlowData<Tally>| {
    Box::pin(async move {
      data.write().visited.push(stage.to_string());
      Err(TallyError::Stage(message.to_string()))
    })
  })
}

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub static FACTORY_CALLS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static EXTRACTOR_CALLS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  FACTORY_CALLS.store(0, Ordering::SeqCst);
  EXTRACTOR_CALLS.store(0, Ordering::SeqCst);
}
