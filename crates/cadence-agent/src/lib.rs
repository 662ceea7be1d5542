//! cadence-agent: conversation workflow engine
//!
//! This crate sequences a user turn through a small directed graph of steps
//! (context loading, classification, specialist dispatch, summarization),
//! merging each step's partial update into the conversation state with
//! per-field reducers, and checkpointing the result per thread.

pub mod checkpoint;
pub mod domain;
pub mod error;
pub mod events;
pub mod graph;
pub mod routing;
pub mod runtime;
pub mod specialists;
pub mod state;
pub mod steps;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use checkpoint::{Checkpointer, FileCheckpointer, MemoryCheckpointer};
pub use domain::{Coach, InMemoryTaskService, PsychProfile, Task, TaskPatch, TaskService, User};
pub use error::{Error, Result};
pub use events::WorkflowEvent;
pub use graph::{Edge, Step, Transition, Workflow, WorkflowBuilder};
pub use runtime::{AgentRuntime, RuntimeConfig, TurnRequest, TurnResponse};
pub use specialists::Specialist;
pub use state::{
    ActionItem, ActionType, AgentType, ChatMessage, ConversationState, MessageMetadata,
    MessageUpdate, Role, StateUpdate, TurnContext,
};
pub use store::{InMemoryStore, MemoryStore};
