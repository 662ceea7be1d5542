//! Workflow event types

use serde::Serialize;

/// Events emitted while a turn executes
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A turn started for a thread
    TurnStart { thread_id: String },

    /// A step began executing
    StepStart { step: String },

    /// A step finished; `error` carries the step's recorded failure, if any
    StepEnd { step: String, error: Option<String> },

    /// The workflow reached the terminal sentinel
    WorkflowEnd { steps: usize },

    /// The turn finished; `fatal` is true when no state was persisted
    TurnEnd { thread_id: String, fatal: bool },
}
