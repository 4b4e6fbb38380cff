// core/src/flow/mod.rs

//! The [`Flow`] type: stage list, handler tables and execution.

mod hooks;
mod run;

use crate::data::FlowData;
use crate::control::Control;
use crate::error::FlowError;
use crate::stage::StageDef;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed stage handler.
///
/// The handler gets its own clone of the shared [`FlowData`]. Lock guards
/// taken inside the handler must be released before the next `.await`.
pub type Handler<T, E> =
  Box<dyn Fn(FlowData<T>) -> Pin<Box<dyn Future<Output = Result<Control, E>> + Send>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) fn label(&self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

/// An ordered, named sequence of stages over a root context `T`.
///
/// `E` is the error type handlers return; engine failures are converted
/// into it through `From<FlowError>`.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) stages: Vec<StageDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(stages: impl IntoIterator<Item = StageDef<T>>) -> Self {
    let stages: Vec<StageDef<T>> = stages.into_iter().collect();
    for (idx, stage) in stages.iter().enumerate() {
      if stages[..idx].iter().any(|s| s.name == stage.name) {
        panic!("bazar_flow setup error: stage '{}' declared twice.", stage.name);
      }
    }
    Self {
      stages,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_stage(&self, stage: &str) -> bool {
    self.stages.iter().any(|s| s.name == stage)
  }

  /// Unknown stage names are wiring mistakes, not runtime conditions.
  pub(crate) fn ensure_stage(&self, stage: &str) {
    if !self.has_stage(stage) {
      panic!("bazar_flow setup error: stage '{}' is not part of this flow.", stage);
    }
  }

  pub(crate) fn table(&self, phase: Phase) -> &HashMap<String, Vec<Handler<T, E>>> {
    match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    }
  }

  pub(crate) fn table_mut(&mut self, phase: Phase) -> &mut HashMap<String, Vec<Handler<T, E>>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  pub(crate) fn set_optional(&mut self, stage: &str, optional: bool) {
    if let Some(def) = self.stages.iter_mut().find(|s| s.name == stage) {
      def.optional = optional;
    }
  }
}
