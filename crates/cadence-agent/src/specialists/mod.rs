//! Specialist responders
//!
//! Each specialist is a function from the full conversation state to a
//! partial update: new messages tagged with its own identity, proposed
//! action items, and at most one final response. All five are interchangeable
//! under [`Specialist`]; only their prompts and action vocabularies differ.

pub mod adaptation;
pub mod analytics;
pub mod execution_coach;
pub mod planning;
pub mod task_creation;

pub use adaptation::AdaptationSpecialist;
pub use analytics::AnalyticsSpecialist;
pub use execution_coach::ExecutionCoachSpecialist;
pub use planning::PlanningSpecialist;
pub use task_creation::TaskCreationSpecialist;

use std::sync::Arc;

use async_trait::async_trait;
use cadence_ai::PromptMessage;
use serde::Deserialize;

use crate::{
    error::Result,
    graph::Step,
    state::{ActionItem, ActionType, AgentType, ConversationState, Role, StateUpdate},
};

/// The common shape every responder satisfies.
///
/// `process` may fail; the [`SpecialistStep`] wrapper turns failures into an
/// `error` field update so the turn still reaches a terminal decision.
#[async_trait]
pub trait Specialist: Send + Sync {
    fn agent_type(&self) -> AgentType;
    async fn process(&self, state: &ConversationState) -> Result<StateUpdate>;
}

/// Adapts a [`Specialist`] to the never-raising [`Step`] contract.
pub struct SpecialistStep {
    inner: Arc<dyn Specialist>,
}

impl SpecialistStep {
    pub fn new(inner: Arc<dyn Specialist>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Step for SpecialistStep {
    async fn run(&self, state: &ConversationState) -> StateUpdate {
        match self.inner.process(state).await {
            Ok(update) => update,
            Err(e) => {
                let label = self.inner.agent_type().label();
                tracing::warn!(agent = label, "specialist failed: {e}");
                StateUpdate::from_error(format!("{label} agent error: {e}"))
            }
        }
    }
}

/// One action row as responders emit it
#[derive(Debug, Deserialize)]
pub(crate) struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Filter raw action rows into typed items.
///
/// Rows typed "none", rows with unknown types, and non-object payloads are
/// dropped silently; a responder inventing an action is not an error.
pub(crate) fn collect_actions(raw: Vec<RawAction>) -> Vec<ActionItem> {
    raw.into_iter()
        .filter_map(|action| {
            if action.kind == "none" {
                return None;
            }
            let Some(action_type) = ActionType::parse(&action.kind) else {
                tracing::debug!(kind = %action.kind, "dropping unrecognized action");
                return None;
            };
            let payload = match action.payload {
                serde_json::Value::Object(_) | serde_json::Value::Null => action.payload,
                _ => serde_json::Value::Null,
            };
            Some(ActionItem {
                action_type,
                payload,
            })
        })
        .collect()
}

/// System prompt + the specialist's private history + the turn prompt.
pub(crate) fn prompt_with_history(
    system: &str,
    state: &ConversationState,
    agent_type: AgentType,
    turn_prompt: String,
) -> Vec<PromptMessage> {
    let mut messages = vec![PromptMessage::system(system)];
    for message in state.history_for(agent_type) {
        messages.push(match message.role {
            Role::User => PromptMessage::user(message.content.as_str()),
            Role::Assistant => PromptMessage::assistant(message.content.as_str()),
        });
    }
    messages.push(PromptMessage::user(turn_prompt));
    messages
}

/// The single-task context block shared by several prompts.
pub(crate) fn task_context(state: &ConversationState) -> String {
    match &state.task {
        Some(task) => format!(
            "Task: {}\nDescription: {}\nPriority: {}\nDeadline: {}",
            task.title,
            task.description.as_deref().unwrap_or("None"),
            task.priority,
            task.deadline.as_deref().unwrap_or("None"),
        ),
        None => "No task provided".to_string(),
    }
}

/// The user-preferences context block.
pub(crate) fn user_context(state: &ConversationState) -> String {
    match state.user.as_ref().and_then(|u| u.psych_profile.as_ref()) {
        Some(profile) => format!(
            "Productivity Time: {}\nTask Approach: {}\nDifficulty Preference: {}",
            profile.productivity_time.as_deref().unwrap_or("Not set"),
            profile.task_approach.as_deref().unwrap_or("Not set"),
            profile.difficulty_preference.as_deref().unwrap_or("Not set"),
        ),
        None => "No user profile available".to_string(),
    }
}

/// The aggregate task-list block for list-aware specialists.
pub(crate) fn tasks_overview(state: &ConversationState) -> String {
    match &state.tasks {
        Some(tasks) if !tasks.is_empty() => {
            let mut overview = format!("User has {} tasks.", tasks.len());
            for (idx, task) in tasks.iter().enumerate() {
                overview.push_str(&format!(
                    "\n\nTask {}: {}\nStatus: {}\nPriority: {}\nStage: {}",
                    idx + 1,
                    task.title,
                    if task.completed {
                        "Completed"
                    } else {
                        "Not Completed"
                    },
                    task.priority,
                    task.stage.as_deref().unwrap_or("None"),
                ));
            }
            overview
        }
        _ => "No tasks available".to_string(),
    }
}
