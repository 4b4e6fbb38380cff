// core/src/registry.rs

//! Type-keyed lookup of flows, so callers can run "the flow for this
//! context type" without holding the flow itself.

use crate::control::Outcome;
use crate::data::FlowData;
use crate::error::FlowError;
use crate::flow::Flow;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<Outcome, AppErr>;
}

struct TypedRunner<T, HErr, AppErr>
where
  T: 'static + Send + Sync,
  HErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, HErr>>,
  _marker: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, HErr, AppErr> ErasedRunner<AppErr> for TypedRunner<T, HErr, AppErr>
where
  T: 'static + Send + Sync,
  HErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<Outcome, AppErr> {
    let typed = data.downcast::<FlowData<T>>().map_err(|_| {
      AppErr::from(FlowError::TypeMismatch {
        expected: std::any::type_name::<FlowData<T>>().to_string(),
      })
    })?;
    self.flow.run(*typed).await.map_err(AppErr::from)
  }
}

/// Registry of flows keyed by their root context type.
///
/// Registering a second flow for the same context type replaces the first.
pub struct Registry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  pub fn register<T, HErr>(&self, flow: Flow<T, HErr>)
  where
    T: 'static + Send + Sync,
    HErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HErr>,
  {
    event!(Level::DEBUG, context = %std::any::type_name::<T>(), stages = ?flow.stage_names(), "Registering flow.");
    let runner = TypedRunner::<T, HErr, AppErr> {
      flow: Arc::new(flow),
      _marker: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  pub fn contains<T: 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the flow registered for `T`.
  #[instrument(name = "Registry::run", skip_all, fields(context = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, data: FlowData<T>) -> Result<Outcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = {
      let flows = self.flows.read();
      flows.get(&TypeId::of::<T>()).cloned()
    };
    let runner = runner.ok_or_else(|| {
      event!(Level::ERROR, "No flow registered for this context type.");
      AppErr::from(FlowError::Configuration {
        stage: "Registry::run".to_string(),
        message: format!("no flow registered for {}", std::any::type_name::<T>()),
      })
    })?;
    runner.run_erased(Box::new(data)).await
  }
}
