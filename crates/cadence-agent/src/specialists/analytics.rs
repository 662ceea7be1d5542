//! Analytics responder: productivity insight over the task list.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_ai::{structured, CompletionRequest, ReasoningService};
use serde::Deserialize;

use crate::{
    error::Result,
    state::{AgentType, ChatMessage, ConversationState, MessageUpdate, StateUpdate},
};

use super::{collect_actions, prompt_with_history, tasks_overview, RawAction, Specialist};

const SYSTEM_PROMPT: &str = "\
You are the analytics responder of Cadence, a task-coaching assistant. You \
analyze completion patterns, surface strengths and weaknesses, and turn \
trends into accessible, actionable observations. Be data-driven, but speak \
plainly.";

const FORMAT_INSTRUCTIONS: &str = "\
Respond with a single JSON object with these keys:
\"actions\": array of objects, each {\"type\": \"logActivity\" or \"none\", \"payload\": object}
\"insights\": array of key observations from the task data
\"recommendations\": array of specific suggestions for improving productivity
\"reasoning\": your analytical approach
\"response\": a concise summary of the insights and recommendations for the user";

#[derive(Debug, Deserialize)]
struct AnalyticsOutput {
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

pub struct AnalyticsSpecialist {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl AnalyticsSpecialist {
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

    fn bullet_list(header: &str, items: &[String]) -> String {
        let mut text = header.to_string();
        for item in items {
            text.push_str("\n- ");
            text.push_str(item);
        }
        text
    }
}

#[async_trait]
impl Specialist for AnalyticsSpecialist {
    fn agent_type(&self) -> AgentType {
        AgentType::Analytics
    }

    async fn process(&self, state: &ConversationState) -> Result<StateUpdate> {
        let turn_prompt = format!(
            "User request: {}\n\nTasks Context:\n{}\n\n\
             Look for trends in completion rates, task types and productivity patterns.\n\n{}",
            state.input,
            tasks_overview(state),
            FORMAT_INSTRUCTIONS,
        );

        let request = CompletionRequest::new(
            self.model.clone(),
            prompt_with_history(SYSTEM_PROMPT, state, self.agent_type(), turn_prompt),
        )
        .with_temperature(self.temperature);

        let completion = self.reasoning.complete(request).await?;
        let output: AnalyticsOutput = structured::extract_json(&completion.text)?;

        let mut update = StateUpdate::default();
        let mut messages = Vec::new();

        if !output.insights.is_empty() {
            messages.push(MessageUpdate::Upsert(
                ChatMessage::assistant(
                    Self::bullet_list("Key Insights:", &output.insights),
                    self.agent_type(),
                )
                .with_label("insights"),
            ));
        }
        if !output.recommendations.is_empty() {
            messages.push(MessageUpdate::Upsert(
                ChatMessage::assistant(
                    Self::bullet_list("Recommendations:", &output.recommendations),
                    self.agent_type(),
                )
                .with_label("recommendations"),
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
