// core/src/branch/route.rs
use super::source::FlowSource;
use crate::control::{Control, Outcome};
use crate::data::FlowData;
use crate::error::FlowError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub(crate) type Extractor<T, S> = Arc<dyn Fn(FlowData<T>) -> Result<FlowData<S>, FlowError> + Send + Sync + 'static>;
pub(crate) type Condition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// One configured route: condition, sub-flow source and extractor.
pub(crate) struct Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) source: Arc<dyn FlowSource<T, S, E>>,
  pub(crate) extractor: Extractor<T, S>,
  pub(crate) condition: Condition<T>,
}

/// Route with the sub-context type erased, so routes over different `S`
/// can live in one list.
#[async_trait]
pub(crate) trait AnyRoute<T, E>: Send + Sync
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, parent: &FlowData<T>) -> bool;

  async fn execute(&self, stage: &str, parent: FlowData<T>) -> Result<Control, E>;
}

#[async_trait]
impl<T, S, E> AnyRoute<T, E> for Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, parent: &FlowData<T>) -> bool {
    let guard = parent.read();
    (self.condition)(&guard)
  }

  #[instrument(
    name = "Route::execute",
    skip(self, parent),
    fields(sub_context = %std::any::type_name::<S>()),
    err(Display)
  )]
  async fn execute(&self, stage: &str, parent: FlowData<T>) -> Result<Control, E> {
    let flow = self
      .source
      .flow(parent.clone())
      .await
      .map_err(|e| E::from(e.into_source_failure(stage)))?;

    let sub = (self.extractor)(parent).map_err(|e| {
      event!(Level::ERROR, error = %e, "Sub-context extraction failed.");
      E::from(e.into_extractor_failure(stage))
    })?;

    match flow.run(sub).await? {
      Outcome::Completed => Ok(Control::Continue),
      Outcome::Halted => {
        event!(Level::INFO, "Sub-flow halted; halting parent.");
        Ok(Control::Halt)
      }
    }
  }
}
