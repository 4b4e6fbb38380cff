// core/src/flow/run.rs
use super::{Flow, Phase};
use crate::control::{Control, Outcome};
use crate::data::FlowData;
use crate::error::FlowError;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every stage in declaration order against `data`.
  ///
  /// Per stage: the skip predicate is checked, then `before`, `on` and
  /// `after` handlers run in registration order. The first
  /// [`Control::Halt`] ends the run with [`Outcome::Halted`]; the first
  /// error ends it with that error.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(context = %std::any::type_name::<T>(), stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run(&self, data: FlowData<T>) -> Result<Outcome, E> {
    event!(Level::DEBUG, "Flow starting.");

    for (idx, stage) in self.stages.iter().enumerate() {
      let name = stage.name.as_str();

      if let Some(skip_if) = &stage.skip_if {
        let skip = {
          let guard = data.read();
          skip_if(&guard)
        };
        if skip {
          event!(Level::DEBUG, stage = name, "Stage skipped by predicate.");
          continue;
        }
      }

      let registered = [Phase::Before, Phase::On, Phase::After]
        .iter()
        .any(|phase| self.table(*phase).get(name).map_or(false, |v| !v.is_empty()));
      if !registered {
        if stage.optional {
          event!(Level::DEBUG, stage = name, "Optional stage has no handlers.");
          continue;
        }
        event!(Level::ERROR, stage = name, "Required stage has no handlers.");
        return Err(E::from(FlowError::HandlerMissing { stage: stage.name.clone() }));
      }

      let span = info_span!("flow_stage", stage = name, index = idx, optional = stage.optional);
      for phase in [Phase::Before, Phase::On, Phase::After] {
        match self.run_phase(phase, name, &data).instrument(span.clone()).await? {
          Control::Continue => {}
          Control::Halt => {
            event!(Level::INFO, stage = name, phase = phase.label(), "Flow halted.");
            return Ok(Outcome::Halted);
          }
        }
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(Outcome::Completed)
  }

  async fn run_phase(&self, phase: Phase, stage: &str, data: &FlowData<T>) -> Result<Control, E> {
    let Some(handlers) = self.table(phase).get(stage) else {
      return Ok(Control::Continue);
    };
    for handler in handlers {
      match handler(data.clone()).await {
        Ok(Control::Continue) => {}
        Ok(Control::Halt) => return Ok(Control::Halt),
        Err(e) => {
          event!(Level::ERROR, phase = phase.label(), error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(Control::Continue)
  }
}
