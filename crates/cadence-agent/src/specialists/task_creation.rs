//! Task-creation responder: turns natural language into structured tasks.
//! This is also the routing fallback, so it must cope with requests the
//! classifier could not place.

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
You are the task-creation responder of Cadence, a task-coaching assistant. \
You turn natural language into well-structured tasks: detect implicit \
deadlines, priorities and categories, and extract every relevant detail the \
user mentions. Be efficient and thorough.";

const FORMAT_INSTRUCTIONS: &str = "\
Respond with a single JSON object with these keys:
\"actions\": array of objects, each {\"type\": \"createTask\" or \"none\", \"payload\": object with title, description, priority, deadline}
\"response\": a concise confirmation to the user describing the tasks you created";

#[derive(Debug, Deserialize)]
struct TaskCreationOutput {
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    response: Option<String>,
}

pub struct TaskCreationSpecialist {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
    temperature: f32,
}

impl TaskCreationSpecialist {
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
impl Specialist for TaskCreationSpecialist {
    fn agent_type(&self) -> AgentType {
        AgentType::TaskCreation
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
        let output: TaskCreationOutput = structured::extract_json(&completion.text)?;

        let mut update = StateUpdate {
            action_items: Some(collect_actions(output.actions)),
            ..Default::default()
        };
        if let Some(response) = output.response.filter(|r| !r.is_empty()) {
            update.messages = vec![MessageUpdate::Upsert(ChatMessage::assistant(
                response.clone(),
                self.agent_type(),
            ))];
            update.agent_response = Some(response);
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::Step;
    use crate::specialists::SpecialistStep;
    use crate::state::ActionType;
    use crate::test_support::Scripted;

    #[tokio::test]
    async fn test_creates_task_from_structured_output() {
        let reply = r#"{
            "actions": [{"type": "createTask", "payload": {"title": "File taxes", "priority": "high"}}],
            "response": "Created \"File taxes\" with high priority."
        }"#;
        let specialist = TaskCreationSpecialist::new(
            Arc::new(Scripted::replies(&[reply])),
            "gpt-4o",
            0.2,
        );

        let mut state = ConversationState::new("u1");
        state.begin_turn("I need to file my taxes soon, it's urgent", None);

        let update = specialist.process(&state).await.unwrap();
        let actions = update.action_items.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::CreateTask);
        assert_eq!(actions[0].payload["title"], "File taxes");
        assert!(update.agent_response.unwrap().contains("File taxes"));
        assert_eq!(update.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_is_an_error() {
        let specialist = TaskCreationSpecialist::new(
            Arc::new(Scripted::replies(&["I made you a task!"])),
            "gpt-4o",
            0.2,
        );

        let mut state = ConversationState::new("u1");
        state.begin_turn("make a task", None);

        let err = specialist.process(&state).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Reasoning(cadence_ai::Error::Malformed(_))
        ));

        // Wrapped in a step, the same failure becomes a state error instead.
        let step = SpecialistStep::new(Arc::new(TaskCreationSpecialist::new(
            Arc::new(Scripted::replies(&["still not JSON"])),
            "gpt-4o",
            0.2,
        )));
        let update = step.run(&state).await;
        assert!(update.error.unwrap().contains("TaskCreation agent error"));
    }
}
