// core/src/branch/source.rs
use crate::data::FlowData;
use crate::error::FlowError;
use crate::flow::Flow;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Supplies the sub-flow a branch route should run.
#[async_trait]
pub trait FlowSource<T, S, E>: Send + Sync + 'static
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn flow(&self, parent: FlowData<T>) -> Result<Arc<Flow<S, E>>, FlowError>;
}

/// Always hands out the same pre-built sub-flow.
pub struct StaticSource<S, E>
where
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<S, E>>,
}

impl<S, E> StaticSource<S, E>
where
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(flow: Arc<Flow<S, E>>) -> Self {
    Self { flow }
  }
}

#[async_trait]
impl<T, S, E> FlowSource<T, S, E> for StaticSource<S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn flow(&self, _parent: FlowData<T>) -> Result<Arc<Flow<S, E>>, FlowError> {
    Ok(self.flow.clone())
  }
}

/// Builds the sub-flow on demand from the parent context, e.g. when the
/// flow needs a service handle that is only known per run.
pub struct FactorySource<T, S, E, F, Fut>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Flow<S, E>>, FlowError>> + Send + 'static,
{
  factory: F,
  _marker: PhantomData<fn() -> (T, S, E)>,
}

impl<T, S, E, F, Fut> FactorySource<T, S, E, F, Fut>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Flow<S, E>>, FlowError>> + Send + 'static,
{
  pub fn new(factory: F) -> Self {
    Self {
      factory,
      _marker: PhantomData,
    }
  }
}

#[async_trait]
impl<T, S, E, F, Fut> FlowSource<T, S, E> for FactorySource<T, S, E, F, Fut>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
  F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<Flow<S, E>>, FlowError>> + Send + 'static,
{
  async fn flow(&self, parent: FlowData<T>) -> Result<Arc<Flow<S, E>>, FlowError> {
    (self.factory)(parent).await
  }
}
