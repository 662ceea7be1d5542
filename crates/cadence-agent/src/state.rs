//! Conversation state and the per-field merge rules
//!
//! Every step returns a [`StateUpdate`] — a typed partial update where an
//! absent field means "unchanged". The engine folds updates into the running
//! [`ConversationState`] with [`ConversationState::apply`].

use serde::{Deserialize, Serialize};

use crate::domain::{Task, User};

/// The specialist responders a turn can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentType {
    TaskCreation,
    Planning,
    ExecutionCoach,
    Adaptation,
    Analytics,
}

impl AgentType {
    /// All routable specialists, in classifier-menu order
    pub const ALL: [AgentType; 5] = [
        AgentType::TaskCreation,
        AgentType::Planning,
        AgentType::ExecutionCoach,
        AgentType::Adaptation,
        AgentType::Analytics,
    ];

    /// The label the classifier is asked to answer with
    pub fn label(&self) -> &'static str {
        match self {
            AgentType::TaskCreation => "TaskCreation",
            AgentType::Planning => "Planning",
            AgentType::ExecutionCoach => "ExecutionCoach",
            AgentType::Adaptation => "Adaptation",
            AgentType::Analytics => "Analytics",
        }
    }

    /// Map a free-form classifier answer onto a specialist.
    ///
    /// Matching is tolerant of casing and surrounding prose; anything
    /// unrecognized falls back to task creation rather than failing the turn.
    pub fn from_classifier_label(text: &str) -> AgentType {
        let normalized = text.to_lowercase();
        if normalized.contains("taskcreation") || normalized.contains("task creation") {
            AgentType::TaskCreation
        } else if normalized.contains("planning") {
            AgentType::Planning
        } else if normalized.contains("execution") || normalized.contains("coach") {
            AgentType::ExecutionCoach
        } else if normalized.contains("adaptation") {
            AgentType::Adaptation
        } else if normalized.contains("analytics") {
            AgentType::Analytics
        } else {
            AgentType::TaskCreation
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Closed metadata schema for chat messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMetadata {
    /// The specialist that produced an assistant message
    pub agent_type: Option<AgentType>,
    /// Optional tag for auxiliary messages ("reasoning", "insights", ...)
    pub label: Option<String>,
}

/// One entry in the shared conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
    #[serde(default)]
    pub timestamp: i64,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            metadata: MessageMetadata::default(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create an assistant message tagged with its originating specialist
    pub fn assistant(content: impl Into<String>, agent_type: AgentType) -> Self {
        let mut message = Self::with_role(Role::Assistant, content);
        message.metadata.agent_type = Some(agent_type);
        message
    }

    /// Attach a label to the message metadata
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata.label = Some(label.into());
        self
    }
}

/// Side effects a specialist can propose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    CreateTask,
    UpdateTask,
    CreateSubtasks,
    SearchTasks,
    UpdateManyTasks,
    LogActivity,
    ScheduleReminder,
    ProvideMotivation,
    GiveAdvice,
    AskQuestion,
}

impl ActionType {
    /// Parse the camelCase label a responder emits; `None` for unknown labels
    pub fn parse(label: &str) -> Option<ActionType> {
        serde_json::from_value(serde_json::Value::String(label.to_string())).ok()
    }
}

/// A proposed side effect, consumed by an external executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub action_type: ActionType,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Request-scoped hints for a turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnContext {
    /// The task the user's message refers to, when known
    pub task_id: Option<String>,
}

/// The record threaded through every workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Owner of the conversation; immutable for its lifetime
    pub user_id: String,
    /// Latest user utterance
    #[serde(default)]
    pub input: String,
    /// Final text produced this turn; its presence ends the specialist phase
    #[serde(default)]
    pub agent_response: Option<String>,
    /// Shared conversation log, insertion-ordered, unique by id
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Request-scoped hints
    #[serde(default)]
    pub context: Option<TurnContext>,
    /// Cached user snapshot, loaded once per turn
    #[serde(default)]
    pub user: Option<User>,
    /// Cached single-task snapshot
    #[serde(default)]
    pub task: Option<Task>,
    /// Cached aggregate task list
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
    /// Selected specialist; `None` means no further routing
    #[serde(default)]
    pub active_agent: Option<AgentType>,
    /// Proposed side effects from the most recent specialist run
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    /// Rolling digest of pruned history
    #[serde(default)]
    pub summary: Option<String>,
    /// Last error; sticky until overwritten, non-fatal
    #[serde(default)]
    pub error: Option<String>,
}

impl ConversationState {
    /// Create a fresh state for a conversation
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            input: String::new(),
            agent_response: None,
            messages: Vec::new(),
            context: None,
            user: None,
            task: None,
            tasks: None,
            active_agent: None,
            action_items: Vec::new(),
            summary: None,
            error: None,
        }
    }

    /// Reset the per-turn fields and record the user's new message.
    ///
    /// Called on a rehydrated checkpoint before the workflow runs, so the
    /// classify guard only ever sees an `agent_response` produced within the
    /// current turn.
    pub fn begin_turn(&mut self, input: &str, task_id: Option<String>) {
        self.input = input.to_string();
        self.context = task_id.map(|task_id| TurnContext {
            task_id: Some(task_id),
        });
        self.agent_response = None;
        self.active_agent = None;
        self.error = None;
        self.apply(StateUpdate {
            messages: vec![MessageUpdate::Upsert(ChatMessage::user(input))],
            ..Default::default()
        });
    }

    /// Merge a partial update using the per-field reducer rules
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(agent_response) = update.agent_response {
            self.agent_response = Some(agent_response);
        }
        if let Some(user) = update.user {
            self.user = Some(user);
        }
        if let Some(task) = update.task {
            self.task = Some(task);
        }
        if let Some(tasks) = update.tasks {
            self.tasks = Some(tasks);
        }
        if let Some(active_agent) = update.active_agent {
            self.active_agent = active_agent;
        }
        if let Some(action_items) = update.action_items {
            self.action_items = action_items;
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        for message_update in update.messages {
            match message_update {
                MessageUpdate::Upsert(message) => {
                    match self.messages.iter_mut().find(|m| m.id == message.id) {
                        Some(existing) => *existing = message,
                        None => self.messages.push(message),
                    }
                }
                MessageUpdate::Remove { id } => {
                    self.messages.retain(|m| m.id != id);
                }
            }
        }
    }

    /// A specialist's private view of the shared log: every user message plus
    /// the assistant messages it produced itself.
    pub fn history_for(&self, agent_type: AgentType) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| match m.role {
                Role::User => true,
                Role::Assistant => m.metadata.agent_type == Some(agent_type),
            })
            .collect()
    }
}

/// An instruction against the message log
#[derive(Debug, Clone, PartialEq)]
pub enum MessageUpdate {
    /// Append a new message, or replace an existing one in place by id
    Upsert(ChatMessage),
    /// Delete a message by id; unknown ids are ignored
    Remove { id: String },
}

/// A typed partial update over [`ConversationState`].
///
/// `None` means "unchanged" for every overwrite-rule field. `active_agent`
/// is doubly optional because `Some(None)` must be expressible: it clears the
/// route, which is the classify step's terminal outcome.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub agent_response: Option<String>,
    pub user: Option<User>,
    pub task: Option<Task>,
    pub tasks: Option<Vec<Task>>,
    pub active_agent: Option<Option<AgentType>>,
    pub action_items: Option<Vec<ActionItem>>,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub messages: Vec<MessageUpdate>,
}

impl StateUpdate {
    /// An update that only records an error
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_messages(count: usize) -> ConversationState {
        let mut state = ConversationState::new("u1");
        for i in 0..count {
            state.apply(StateUpdate {
                messages: vec![MessageUpdate::Upsert(ChatMessage::user(format!("m{i}")))],
                ..Default::default()
            });
        }
        state
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = ConversationState::new("u1");
        let update = StateUpdate {
            agent_response: Some("done".into()),
            active_agent: Some(Some(AgentType::Planning)),
            action_items: Some(vec![ActionItem {
                action_type: ActionType::CreateTask,
                payload: serde_json::json!({"title": "x"}),
            }]),
            messages: vec![
                MessageUpdate::Upsert(ChatMessage::user("hello")),
                MessageUpdate::Upsert(ChatMessage::assistant("hi", AgentType::Planning)),
            ],
            ..Default::default()
        };

        once.apply(update.clone());
        let mut twice = once.clone();
        twice.apply(update);

        assert_eq!(once.messages, twice.messages);
        assert_eq!(once.action_items, twice.action_items);
        assert_eq!(once.agent_response, twice.agent_response);
        assert_eq!(once.active_agent, twice.active_agent);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut state = state_with_messages(3);
        let mut replacement = state.messages[1].clone();
        replacement.content = "edited".to_string();

        state.apply(StateUpdate {
            messages: vec![MessageUpdate::Upsert(replacement)],
            ..Default::default()
        });

        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[1].content, "edited");
        assert_eq!(state.messages[0].content, "m0");
        assert_eq!(state.messages[2].content, "m2");
    }

    #[test]
    fn test_remove_preserves_relative_order() {
        let mut state = state_with_messages(4);
        let victim = state.messages[1].id.clone();

        state.apply(StateUpdate {
            messages: vec![MessageUpdate::Remove { id: victim.clone() }],
            ..Default::default()
        });

        let contents: Vec<_> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m2", "m3"]);

        // Removing the same id again is a no-op
        state.apply(StateUpdate {
            messages: vec![MessageUpdate::Remove { id: victim }],
            ..Default::default()
        });
        assert_eq!(state.messages.len(), 3);
    }

    #[test]
    fn test_absent_fields_are_unchanged() {
        let mut state = ConversationState::new("u1");
        state.agent_response = Some("keep".into());
        state.summary = Some("digest".into());

        state.apply(StateUpdate::from_error("boom"));

        assert_eq!(state.agent_response.as_deref(), Some("keep"));
        assert_eq!(state.summary.as_deref(), Some("digest"));
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_action_items_overwrite_not_accumulate() {
        let mut state = ConversationState::new("u1");
        let first = vec![
            ActionItem {
                action_type: ActionType::CreateTask,
                payload: serde_json::Value::Null,
            },
            ActionItem {
                action_type: ActionType::LogActivity,
                payload: serde_json::Value::Null,
            },
        ];
        state.apply(StateUpdate {
            action_items: Some(first),
            ..Default::default()
        });
        assert_eq!(state.action_items.len(), 2);

        state.apply(StateUpdate {
            action_items: Some(vec![ActionItem {
                action_type: ActionType::GiveAdvice,
                payload: serde_json::Value::Null,
            }]),
            ..Default::default()
        });
        assert_eq!(state.action_items.len(), 1);
        assert_eq!(state.action_items[0].action_type, ActionType::GiveAdvice);
    }

    #[test]
    fn test_active_agent_can_be_cleared() {
        let mut state = ConversationState::new("u1");
        state.apply(StateUpdate {
            active_agent: Some(Some(AgentType::Analytics)),
            ..Default::default()
        });
        assert_eq!(state.active_agent, Some(AgentType::Analytics));

        state.apply(StateUpdate {
            active_agent: Some(None),
            ..Default::default()
        });
        assert_eq!(state.active_agent, None);
    }

    #[test]
    fn test_history_for_filters_by_specialist() {
        let mut state = ConversationState::new("u1");
        state.apply(StateUpdate {
            messages: vec![
                MessageUpdate::Upsert(ChatMessage::user("break this down")),
                MessageUpdate::Upsert(ChatMessage::assistant("plan...", AgentType::Planning)),
                MessageUpdate::Upsert(ChatMessage::assistant("insight", AgentType::Analytics)),
                MessageUpdate::Upsert(ChatMessage::user("thanks")),
            ],
            ..Default::default()
        });

        let planning_view = state.history_for(AgentType::Planning);
        let contents: Vec<_> = planning_view.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["break this down", "plan...", "thanks"]);
    }

    #[test]
    fn test_begin_turn_resets_turn_fields() {
        let mut state = ConversationState::new("u1");
        state.agent_response = Some("old response".into());
        state.active_agent = Some(AgentType::Planning);
        state.error = Some("old error".into());
        state.summary = Some("old summary".into());

        state.begin_turn("new message", Some("task-9".into()));

        assert_eq!(state.input, "new message");
        assert!(state.agent_response.is_none());
        assert!(state.active_agent.is_none());
        assert!(state.error.is_none());
        // Long-lived fields survive the reset
        assert_eq!(state.summary.as_deref(), Some("old summary"));
        assert_eq!(
            state.context.as_ref().and_then(|c| c.task_id.as_deref()),
            Some("task-9")
        );
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::User);
    }

    #[test]
    fn test_classifier_label_mapping() {
        assert_eq!(
            AgentType::from_classifier_label("Planning"),
            AgentType::Planning
        );
        assert_eq!(
            AgentType::from_classifier_label("  executioncoach\n"),
            AgentType::ExecutionCoach
        );
        assert_eq!(
            AgentType::from_classifier_label("I think the Coach should handle this"),
            AgentType::ExecutionCoach
        );
        assert_eq!(
            AgentType::from_classifier_label("weather report"),
            AgentType::TaskCreation
        );
    }

    #[test]
    fn test_action_type_parse() {
        assert_eq!(ActionType::parse("createTask"), Some(ActionType::CreateTask));
        assert_eq!(
            ActionType::parse("updateManyTasks"),
            Some(ActionType::UpdateManyTasks)
        );
        assert_eq!(ActionType::parse("none"), None);
        assert_eq!(ActionType::parse("launchRocket"), None);
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = ConversationState::new("u1");
        state.begin_turn("hello", None);
        state.apply(StateUpdate {
            summary: Some("so far".into()),
            active_agent: Some(Some(AgentType::Adaptation)),
            ..Default::default()
        });

        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, "u1");
        assert_eq!(back.messages.len(), 1);
        assert_eq!(back.active_agent, Some(AgentType::Adaptation));
        assert_eq!(back.summary.as_deref(), Some("so far"));
    }
}
