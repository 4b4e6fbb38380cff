// core/src/flow/hooks.rs
use super::{Flow, Handler, Phase};
use crate::control::Control;
use crate::data::FlowData;
use crate::error::FlowError;
use std::future::Future;

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a handler that runs ahead of the stage's `on` handlers.
  pub fn before<F, HErr>(&mut self, stage: &str, handler: impl Fn(FlowData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, stage, handler);
  }

  /// Registers a main handler for a stage. Several may be registered; they run in order.
  pub fn on<F, HErr>(&mut self, stage: &str, handler: impl Fn(FlowData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, stage, handler);
  }

  pub fn after<F, HErr>(&mut self, stage: &str, handler: impl Fn(FlowData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, stage, handler);
  }

  fn push_handler<F, HErr>(
    &mut self,
    phase: Phase,
    stage: &str,
    handler: impl Fn(FlowData<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<Control, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_stage(stage);
    let boxed: Handler<T, E> = Box::new(move |data| {
      let fut = handler(data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.table_mut(phase).entry(stage.to_string()).or_default().push(boxed);
  }

  /// Replaces whatever `on` handlers a stage had with a single one.
  pub(crate) fn replace_on(&mut self, stage: &str, handler: Handler<T, E>) {
    self.ensure_stage(stage);
    self.on.insert(stage.to_string(), vec![handler]);
  }
}
