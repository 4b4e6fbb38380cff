// core/src/control.rs

/// Signal returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  /// Keep going with the remaining handlers and stages.
  Continue,
  /// Stop the flow right here. Nothing after this handler runs.
  Halt,
}

/// How a whole run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  /// A handler answered [`Control::Halt`].
  Halted,
}

impl Outcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, Outcome::Completed)
  }
}
