//! Error types for cadence-agent

use thiserror::Error;

/// Result type alias using cadence-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the reasoning-service layer
    #[error(transparent)]
    Reasoning(#[from] cadence_ai::Error),

    /// Checkpoint load or save failed
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// A key/value or task store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// The workflow ran more steps than the configured bound allows
    #[error("workflow exceeded step bound ({limit} steps)")]
    StepBoundExceeded { limit: usize },

    /// A routing function produced a step name the graph does not know
    #[error("unknown workflow step: {0}")]
    UnknownStep(String),

    /// The turn ran past its deadline
    #[error("turn deadline exceeded")]
    DeadlineExceeded,

    /// A generic engine error
    #[error("{0}")]
    Other(String),
}
