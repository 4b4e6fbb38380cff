// core/src/branch/builder.rs
use super::route::{AnyRoute, Route};
use super::source::{FactorySource, FlowSource, StaticSource};
use crate::control::Control;
use crate::data::FlowData;
use crate::error::FlowError;
use crate::flow::{Flow, Handler};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy)]
enum NoMatch {
  Signal(Control),
  Fail,
}

/// Collects routes for one stage of a [`Flow`]. Obtained from [`Flow::branch`].
pub struct BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: &'f mut Flow<T, E>,
  stage: String,
  routes: Vec<Arc<dyn AnyRoute<T, E>>>,
  no_match: NoMatch,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Turns `stage` into a branch. Routes are tried in the order they are
  /// added; the first whose condition holds runs.
  pub fn branch(&mut self, stage: &str) -> BranchBuilder<'_, T, E> {
    self.ensure_stage(stage);
    BranchBuilder {
      flow: self,
      stage: stage.to_string(),
      routes: Vec::new(),
      no_match: NoMatch::Signal(Control::Continue),
    }
  }
}

impl<'f, T, E> BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Route to a pre-built sub-flow.
  pub fn route<S>(
    self,
    sub_flow: Arc<Flow<S, E>>,
    extractor: impl Fn(FlowData<T>) -> Result<FlowData<S>, FlowError> + Send + Sync + 'static,
  ) -> RouteConfigurator<'f, T, S, E>
  where
    S: 'static + Send + Sync,
  {
    RouteConfigurator {
      builder: self,
      source: Arc::new(StaticSource::new(sub_flow)),
      extractor: Arc::new(extractor),
      _sub: PhantomData,
    }
  }

  /// Route to a sub-flow produced per run by `factory`.
  pub fn route_with<S, F, Fut>(
    self,
    factory: F,
    extractor: impl Fn(FlowData<T>) -> Result<FlowData<S>, FlowError> + Send + Sync + 'static,
  ) -> RouteConfigurator<'f, T, S, E>
  where
    S: 'static + Send + Sync,
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<Flow<S, E>>, FlowError>> + Send + 'static,
  {
    RouteConfigurator {
      builder: self,
      source: Arc::new(FactorySource::new(factory)),
      extractor: Arc::new(extractor),
      _sub: PhantomData,
    }
  }

  /// Signal returned when no route matches. Defaults to [`Control::Continue`].
  pub fn otherwise(mut self, control: Control) -> Self {
    self.no_match = NoMatch::Signal(control);
    self
  }

  /// Treat "no route matched" as [`FlowError::NoRouteMatched`].
  pub fn or_fail(mut self) -> Self {
    self.no_match = NoMatch::Fail;
    self
  }

  /// Installs the branch as the stage's only `on` handler.
  ///
  /// When `optional` is true a failing route is logged and the parent flow
  /// continues; otherwise the route's error ends the parent run.
  pub fn seal(self, optional: bool) {
    let stage = self.stage.clone();
    let routes = Arc::new(self.routes);
    let no_match = self.no_match;
    let route_count = routes.len();

    let handler: Handler<T, E> = Box::new(move |data: FlowData<T>| {
      let routes = routes.clone();
      let stage = stage.clone();
      Box::pin(async move {
        for route in routes.iter() {
          if !route.matches(&data) {
            continue;
          }
          event!(Level::DEBUG, stage = %stage, "Branch route matched.");
          return match route.execute(&stage, data.clone()).await {
            Ok(control) => Ok(control),
            Err(e) if optional => {
              event!(Level::WARN, stage = %stage, error = %e, "Optional branch failed; continuing.");
              Ok(Control::Continue)
            }
            Err(e) => Err(e),
          };
        }
        match no_match {
          NoMatch::Signal(control) => {
            event!(Level::DEBUG, stage = %stage, ?control, "No branch route matched.");
            Ok(control)
          }
          NoMatch::Fail => Err(E::from(FlowError::NoRouteMatched { stage })),
        }
      })
    });

    self.flow.set_optional(&self.stage, optional);
    self.flow.replace_on(&self.stage, handler);
    event!(Level::DEBUG, stage = %self.stage, routes = route_count, "Branch sealed.");
  }
}

/// Pending route waiting for its condition. Call [`RouteConfigurator::when`]
/// to return to the builder.
pub struct RouteConfigurator<'f, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  builder: BranchBuilder<'f, T, E>,
  source: Arc<dyn FlowSource<T, S, E>>,
  extractor: Arc<dyn Fn(FlowData<T>) -> Result<FlowData<S>, FlowError> + Send + Sync + 'static>,
  _sub: PhantomData<fn() -> S>,
}

impl<'f, T, S, E> RouteConfigurator<'f, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn when(mut self, condition: impl Fn(&T) -> bool + Send + Sync + 'static) -> BranchBuilder<'f, T, E> {
    let route = Route::<T, S, E> {
      source: self.source,
      extractor: self.extractor,
      condition: Arc::new(condition),
    };
    self.builder.routes.push(Arc::new(route));
    self.builder
  }

  /// Route unconditionally. Useful as the last route of a branch.
  pub fn always(self) -> BranchBuilder<'f, T, E> {
    self.when(|_| true)
  }
}
