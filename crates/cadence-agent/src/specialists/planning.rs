//! Planning responder: task breakdown and prioritization.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_ai::{structured, CompletionRequest, ReasoningService};
use serde::Deserialize;

use crate::{
    error::Result,
    state::{AgentType, ChatMessage, ConversationState, MessageUpdate, StateUpdate},
};

use super::{collect_actions, prompt_with_history, task_context, user_context, RawAction, Specialist};

const SYSTEM_PROMPT: &str = "\
You are the planning responder of Cadence, a task-coaching assistant. You \
break complex tasks into manageable subtasks, prioritize the task list \
against deadlines and the user's preferences, account for dependencies, and \
suggest practical scheduling. Plans must be actionable, not aspirational.";

const FORMAT_INSTRUCTIONS: &str = "\
Respond with a single JSON object with these keys:
\"actions\": array of objects, each {\"type\": one of createSubtasks, updateTask, updateManyTasks, none; \"payload\": object}
\"reasoning\": your explanation of the breakdown or prioritization strategy
\"response\": a concise, helpful response to the user explaining your actions and plans";

#[derive(Debug, Deserialize)]
struct PlanningOutput {
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

pub struct PlanningSpecialist {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl PlanningSpecialist {
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            reasoning,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl Specialist for PlanningSpecialist {
    fn agent_type(&self) -> AgentType {
        AgentType::Planning
    }

    async fn process(&self, state: &ConversationState) -> Result<StateUpdate> {
        let turn_prompt = format!(
            "User request: {}\n\nTask Context:\n{}\n\nUser Context:\n{}\n\n\
             For a breakdown, create subtasks completable in 10-15 minutes each. \
             For prioritization, weigh deadlines, importance and the user's preferences.\n\n{}",
            state.input,
            task_context(state),
            user_context(state),
            FORMAT_INSTRUCTIONS,
        );

        let request = CompletionRequest::new(
            self.model.clone(),
            prompt_with_history(SYSTEM_PROMPT, state, self.agent_type(), turn_prompt),
        )
        .with_temperature(self.temperature);

        let completion = self.reasoning.complete(request).await?;
        let output: PlanningOutput = structured::extract_json(&completion.text)?;

        let mut update = StateUpdate::default();
        let mut messages = Vec::new();

        if let Some(reasoning) = output.reasoning.filter(|r| !r.is_empty()) {
            messages.push(MessageUpdate::Upsert(
                ChatMessage::assistant(reasoning, self.agent_type()).with_label("reasoning"),
            ));
        }

        update.action_items = Some(collect_actions(output.actions));

        if let Some(response) = output.response.filter(|r| !r.is_empty()) {
            messages.push(MessageUpdate::Upsert(ChatMessage::assistant(
                response.clone(),
                self.agent_type(),
            )));
            update.agent_response = Some(response);
        }

        update.messages = messages;
        Ok(update)
    }
}
