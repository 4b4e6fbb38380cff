// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself, as opposed to the errors that
/// application handlers return.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Required stage '{stage}' has no handlers")]
  HandlerMissing { stage: String },

  #[error("Extractor failed for stage '{stage}': {source}")]
  ExtractorFailure {
    stage: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Flow source failed for branch stage '{stage}': {source}")]
  SourceFailure {
    stage: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No branch route matched in stage '{stage}'")]
  NoRouteMatched { stage: String },

  #[error("Context type mismatch, expected {expected}")]
  TypeMismatch { expected: String },

  #[error("Configuration error in '{stage}': {message}")]
  Configuration { stage: String, message: String },

  #[error("Handler error: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

impl FlowError {
  /// Re-labels a failure coming out of a user extractor with the stage it ran in.
  pub(crate) fn into_extractor_failure(self, stage: &str) -> Self {
    match self {
      FlowError::Handler { source } | FlowError::ExtractorFailure { source, .. } => FlowError::ExtractorFailure {
        stage: stage.to_string(),
        source,
      },
      other => other,
    }
  }

  pub(crate) fn into_source_failure(self, stage: &str) -> Self {
    match self {
      FlowError::Handler { source } | FlowError::SourceFailure { source, .. } => FlowError::SourceFailure {
        stage: stage.to_string(),
        source,
      },
      other => FlowError::SourceFailure {
        stage: stage.to_string(),
        source: anyhow::anyhow!(other.to_string()),
      },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
