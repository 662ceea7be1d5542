//! Built-in workflow steps: context loading, classification, summarization
//!
//! Specialist steps live in [`crate::specialists`].

use std::sync::Arc;

use async_trait::async_trait;
use cadence_ai::{CompletionRequest, PromptMessage, ReasoningService};

use crate::{
    domain::TaskService,
    graph::Step,
    state::{AgentType, ConversationState, MessageUpdate, StateUpdate},
};

/// After summarization, only this many of the newest messages survive.
pub const KEPT_MESSAGES: usize = 2;

const SUPERVISOR_PROMPT: &str = "\
You are the supervisor of Cadence, a task-coaching assistant. You read each \
user request and decide which specialized responder should handle it. Be \
decisive; never answer the request yourself.";

const CLASSIFY_PROMPT: &str = "\
Based on the user's request below, determine which specialized responder should handle it.

User request: {input}

Available responders:
- TaskCreation: for turning natural language into new, well-structured tasks
- Planning: for breaking tasks into subtasks or prioritizing the task list
- ExecutionCoach: for motivation, progress tracking and guidance during execution
- Adaptation: for adjusting plans or strategies when circumstances change
- Analytics: for insights about productivity and completion patterns

Respond with ONLY the responder name (TaskCreation, Planning, ExecutionCoach, Adaptation, or Analytics).";

const CREATE_SUMMARY_PROMPT: &str = "\
Create a summary of the conversation below:
{conversation}";

const EXTEND_SUMMARY_PROMPT: &str = "\
This is the summary of the conversation to date:
{summary}

Extend the summary by taking into account the new messages below:
{conversation}";

/// Loads the user profile and, when the turn references one, the single task.
pub struct LoadContext {
    tasks: Arc<dyn TaskService>,
}

impl LoadContext {
    pub fn new(tasks: Arc<dyn TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Step for LoadContext {
    async fn run(&self, state: &ConversationState) -> StateUpdate {
        let mut update = StateUpdate::default();

        match self.tasks.fetch_user(&state.user_id).await {
            Ok(user) => update.user = user,
            Err(e) => {
                tracing::warn!(user_id = %state.user_id, "context load failed: {e}");
                return StateUpdate::from_error(format!("Failed to load context: {e}"));
            }
        }

        if let Some(task_id) = state.context.as_ref().and_then(|c| c.task_id.as_deref()) {
            match self.tasks.fetch_task(task_id, &state.user_id).await {
                Ok(task) => update.task = task,
                Err(e) => {
                    tracing::warn!(task_id, "task load failed: {e}");
                    update.error = Some(format!("Failed to load context: {e}"));
                }
            }
        }

        update
    }
}

/// Loads the aggregate task list for specialists that need it.
pub struct LoadTasks {
    tasks: Arc<dyn TaskService>,
}

impl LoadTasks {
    pub fn new(tasks: Arc<dyn TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Step for LoadTasks {
    async fn run(&self, state: &ConversationState) -> StateUpdate {
        match self.tasks.fetch_tasks(&state.user_id).await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "loaded task list");
                StateUpdate {
                    tasks: Some(tasks),
                    ..Default::default()
                }
            }
            Err(e) => StateUpdate::from_error(format!("Failed to load tasks: {e}")),
        }
    }
}

/// Chooses the specialist for this turn.
pub struct Classify {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl Classify {
    pub fn new(reasoning: Arc<dyn ReasoningService>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            reasoning,
            model: model.into(),
            temperature,
        }
    }

    async fn classify(&self, state: &ConversationState) -> cadence_ai::Result<AgentType> {
        let request = CompletionRequest::new(
            self.model.clone(),
            vec![
                PromptMessage::system(SUPERVISOR_PROMPT),
                PromptMessage::user(CLASSIFY_PROMPT.replace("{input}", &state.input)),
            ],
        )
        .with_temperature(self.temperature);

        let completion = self.reasoning.complete(request).await?;
        Ok(AgentType::from_classifier_label(&completion.text))
    }
}

#[async_trait]
impl Step for Classify {
    async fn run(&self, state: &ConversationState) -> StateUpdate {
        // Re-entrancy guard: a completed turn must not be re-routed.
        if state.agent_response.is_some() {
            return StateUpdate {
                active_agent: Some(None),
                ..Default::default()
            };
        }

        match self.classify(state).await {
            Ok(agent) => {
                tracing::debug!(agent = agent.label(), "classified request");
                StateUpdate {
                    active_agent: Some(Some(agent)),
                    ..Default::default()
                }
            }
            Err(e) => StateUpdate {
                active_agent: Some(Some(AgentType::TaskCreation)),
                error: Some(format!("Failed to determine agent: {e}")),
                ..Default::default()
            },
        }
    }
}

/// Compresses the conversation log into the rolling summary.
pub struct Summarize {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl Summarize {
    pub fn new(reasoning: Arc<dyn ReasoningService>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            reasoning,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl Step for Summarize {
    async fn run(&self, state: &ConversationState) -> StateUpdate {
        let conversation = state
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let prompt = match &state.summary {
            Some(summary) => EXTEND_SUMMARY_PROMPT
                .replace("{summary}", summary)
                .replace("{conversation}", &conversation),
            None => CREATE_SUMMARY_PROMPT.replace("{conversation}", &conversation),
        };

        let request = CompletionRequest::new(
            self.model.clone(),
            vec![PromptMessage::user(prompt)],
        )
        .with_temperature(self.temperature);

        match self.reasoning.complete(request).await {
            Ok(completion) => {
                let keep_from = state.messages.len().saturating_sub(KEPT_MESSAGES);
                let removals = state.messages[..keep_from]
                    .iter()
                    .map(|m| MessageUpdate::Remove { id: m.id.clone() })
                    .collect::<Vec<_>>();
                tracing::debug!(pruned = removals.len(), "conversation summarized");
                StateUpdate {
                    summary: Some(completion.text),
                    messages: removals,
                    ..Default::default()
                }
            }
            Err(e) => StateUpdate::from_error(format!("Failed to generate summary: {e}")),
        }
    }
}
