//! Execution-coach responder: motivation and guidance while the user works.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_ai::{structured, CompletionRequest, ReasoningService};
use serde::Deserialize;

use crate::{
    error::Result,
    state::{AgentType, ChatMessage, ConversationState, MessageUpdate, StateUpdate},
};

use super::{collect_actions, prompt_with_history, tasks_overview, user_context, RawAction, Specialist};

const SYSTEM_PROMPT: &str = "\
You are the execution-coach responder of Cadence, a task-coaching assistant. \
You provide motivation and encouragement during task execution, suggest \
productivity techniques suited to the task at hand, track progress, and help \
the user past obstacles. Be supportive but firm, and adapt your tone to the \
user's coaching preferences.";

const FORMAT_INSTRUCTIONS: &str = "\
Respond with a single JSON object with these keys:
\"actions\": array of objects, each {\"type\": one of updateTask, logActivity, scheduleReminder, provideMotivation, giveAdvice, askQuestion, none; \"payload\": object}
\"motivationalMessage\": a short encouragement tailored to the user
\"reasoning\": why you chose this coaching approach
\"response\": a concise, helpful response to the user";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoachOutput {
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    motivational_message: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

pub struct ExecutionCoachSpecialist {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl ExecutionCoachSpecialist {
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
impl Specialist for ExecutionCoachSpecialist {
    fn agent_type(&self) -> AgentType {
        AgentType::ExecutionCoach
    }

    async fn process(&self, state: &ConversationState) -> Result<StateUpdate> {
        let turn_prompt = format!(
            "User request: {}\n\nTasks:\n{}\n\nUser Context:\n{}\n\n{}",
            state.input,
            tasks_overview(state),
            user_context(state),
            FORMAT_INSTRUCTIONS,
        );

        let request = CompletionRequest::new(
            self.model.clone(),
            prompt_with_history(SYSTEM_PROMPT, state, self.agent_type(), turn_prompt),
        )
        .with_temperature(self.temperature);

        let completion = self.reasoning.complete(request).await?;
        let output: CoachOutput = structured::extract_json(&completion.text)?;

        let mut update = StateUpdate::default();
        let mut messages = Vec::new();

        if let Some(motivation) = output.motivational_message.filter(|m| !m.is_empty()) {
            messages.push(MessageUpdate::Upsert(
                ChatMessage::assistant(motivation, self.agent_type()).with_label("motivation"),
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
