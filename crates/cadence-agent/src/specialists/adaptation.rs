//! Adaptation responder: revises plans when circumstances change.

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
You are the adaptation responder of Cadence, a task-coaching assistant. You \
notice when a strategy stops working, suggest plan modifications, recalibrate \
goals, and adjust difficulty to match the user's recent performance. Stay \
flexible without losing sight of the user's goals.";

const FORMAT_INSTRUCTIONS: &str = "\
Respond with a single JSON object with these keys:
\"actions\": array of objects, each {\"type\": one of updateTask, updateManyTasks, logActivity, none; \"payload\": object}
\"adaptationStrategy\": the revised approach you are proposing
\"reasoning\": why the current approach needs to change
\"response\": a concise, helpful response to the user";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptationOutput {
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    adaptation_strategy: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

pub struct AdaptationSpecialist {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl AdaptationSpecialist {
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
impl Specialist for AdaptationSpecialist {
    fn agent_type(&self) -> AgentType {
        AgentType::Adaptation
    }

    async fn process(&self, state: &ConversationState) -> Result<StateUpdate> {
        let turn_prompt = format!(
            "User request: {}\n\nTask Context:\n{}\n\nUser Context:\n{}\n\n{}",
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
        let output: AdaptationOutput = structured::extract_json(&completion.text)?;

        let mut update = StateUpdate::default();
        let mut messages = Vec::new();

        if let Some(strategy) = output.adaptation_strategy.filter(|s| !s.is_empty()) {
            messages.push(MessageUpdate::Upsert(
                ChatMessage::assistant(strategy, self.agent_type()).with_label("strategy"),
            ));
        }
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
