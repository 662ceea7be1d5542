//! Turn runtime
//!
//! Owns the compiled workflow and its collaborators, serializes turns per
//! thread, enforces the turn deadline, and checkpoints the final state. The
//! only externally observable operation is [`AgentRuntime::process_turn`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use cadence_ai::ReasoningService;

use crate::{
    checkpoint::Checkpointer,
    domain::TaskService,
    error::{Error, Result},
    events::WorkflowEvent,
    graph::{Edge, Transition, Workflow},
    routing,
    specialists::{
        AdaptationSpecialist, AnalyticsSpecialist, ExecutionCoachSpecialist, PlanningSpecialist,
        SpecialistStep, TaskCreationSpecialist,
    },
    state::{ActionItem, ChatMessage, ConversationState},
    steps::{Classify, LoadContext, LoadTasks, Summarize},
    store::MemoryStore,
};

const APOLOGY: &str = "Sorry, I encountered an error processing your request.";
const NO_RESPONSE: &str = "No response generated";

/// Models and limits for a runtime instance
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Model used by the specialists
    pub responder_model: String,
    /// Model used by the classify step
    pub classifier_model: String,
    /// Model used by the summarization step
    pub summarizer_model: String,
    /// Sampling temperature for every reasoning call
    pub temperature: f32,
    /// Whole-turn deadline; expiry aborts the turn without persisting
    pub turn_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            responder_model: "gpt-4o".to_string(),
            classifier_model: "gpt-4o".to_string(),
            summarizer_model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            turn_timeout: Duration::from_secs(120),
        }
    }
}

/// One user turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub message: String,
    pub thread_id: String,
    pub task_id: Option<String>,
}

/// What the caller gets back; fatal failures still produce one of these
#[derive(Debug, Clone)]
pub struct TurnResponse {
    pub response: String,
    pub error: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Proposed side effects for the external action executor
    pub action_items: Vec<ActionItem>,
}

/// The conversation engine, constructed once at process start
pub struct AgentRuntime {
    workflow: Workflow,
    checkpointer: Arc<dyn Checkpointer>,
    store: Arc<dyn MemoryStore>,
    config: RuntimeConfig,
    events: broadcast::Sender<WorkflowEvent>,
    thread_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AgentRuntime {
    /// Wire the fixed topology against the given collaborators
    pub fn new(
        config: RuntimeConfig,
        reasoning: Arc<dyn ReasoningService>,
        tasks: Arc<dyn TaskService>,
        checkpointer: Arc<dyn Checkpointer>,
        store: Arc<dyn MemoryStore>,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(256);
        let workflow = build_workflow(&config, reasoning, tasks, events.clone())?;
        Ok(Self {
            workflow,
            checkpointer,
            store,
            config,
            events,
            thread_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to turn and step events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// The auxiliary long-term memory store, for external collaborators
    pub fn store(&self) -> Arc<dyn MemoryStore> {
        Arc::clone(&self.store)
    }

    /// The runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.thread_locks.lock();
        locks.entry(thread_id.to_string()).or_default().clone()
    }

    /// Run one conversational turn to completion.
    ///
    /// Never returns an error: fatal conditions come back as a response with
    /// the generic apology text and the diagnostic in `error`.
    pub async fn process_turn(&self, request: TurnRequest) -> TurnResponse {
        // Two turns for the same thread both read-then-write its checkpoint,
        // so they must not overlap. Independent threads proceed concurrently.
        let lock = self.thread_lock(&request.thread_id);
        let _guard = lock.lock().await;

        tracing::info!(
            thread_id = %request.thread_id,
            user_id = %request.user_id,
            "processing turn"
        );
        let _ = self.events.send(WorkflowEvent::TurnStart {
            thread_id: request.thread_id.clone(),
        });

        match self.run_turn(&request).await {
            Ok(state) => {
                let _ = self.events.send(WorkflowEvent::TurnEnd {
                    thread_id: request.thread_id.clone(),
                    fatal: false,
                });
                TurnResponse {
                    response: state
                        .agent_response
                        .clone()
                        .unwrap_or_else(|| NO_RESPONSE.to_string()),
                    error: state.error.clone(),
                    action_items: state.action_items.clone(),
                    messages: state.messages,
                }
            }
            Err(e) => {
                tracing::error!(thread_id = %request.thread_id, "turn failed: {e}");
                let _ = self.events.send(WorkflowEvent::TurnEnd {
                    thread_id: request.thread_id.clone(),
                    fatal: true,
                });
                TurnResponse {
                    response: APOLOGY.to_string(),
                    error: Some(e.to_string()),
                    messages: vec![],
                    action_items: vec![],
                }
            }
        }
    }

    async fn run_turn(&self, request: &TurnRequest) -> Result<ConversationState> {
        let mut state = self
            .checkpointer
            .load(&request.thread_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(&request.user_id));

        state.begin_turn(&request.message, request.task_id.clone());

        let state = tokio::time::timeout(self.config.turn_timeout, self.workflow.run(state))
            .await
            .map_err(|_| Error::DeadlineExceeded)??;

        // The checkpoint save is the last action of a successful turn; no
        // fatal path above ever persists a partial state.
        self.checkpointer.save(&request.thread_id, &state).await?;
        Ok(state)
    }
}

fn build_workflow(
    config: &RuntimeConfig,
    reasoning: Arc<dyn ReasoningService>,
    tasks: Arc<dyn TaskService>,
    events: broadcast::Sender<WorkflowEvent>,
) -> Result<Workflow> {
    let responder = config.responder_model.as_str();
    let temperature = config.temperature;

    Workflow::builder()
        .start(routing::LOAD_CONTEXT)
        .events(events)
        .step(
            routing::LOAD_CONTEXT,
            LoadContext::new(tasks.clone()),
            Edge::Static(Transition::To(routing::CLASSIFY)),
        )
        .step(
            routing::CLASSIFY,
            Classify::new(
                reasoning.clone(),
                config.classifier_model.as_str(),
                temperature,
            ),
            Edge::Routed(routing::after_classify),
        )
        .step(
            routing::LOAD_TASKS,
            LoadTasks::new(tasks.clone()),
            Edge::Routed(routing::after_load_tasks),
        )
        .step(
            routing::TASK_CREATION,
            SpecialistStep::new(Arc::new(TaskCreationSpecialist::new(
                reasoning.clone(),
                responder,
                temperature,
            ))),
            Edge::Routed(routing::after_specialist),
        )
        .step(
            routing::PLANNING,
            SpecialistStep::new(Arc::new(PlanningSpecialist::new(
                reasoning.clone(),
                responder,
                temperature,
            ))),
            Edge::Routed(routing::after_specialist),
        )
        .step(
            routing::EXECUTION_COACH,
            SpecialistStep::new(Arc::new(ExecutionCoachSpecialist::new(
                reasoning.clone(),
                responder,
                temperature,
            ))),
            Edge::Routed(routing::after_specialist),
        )
        .step(
            routing::ADAPTATION,
            SpecialistStep::new(Arc::new(AdaptationSpecialist::new(
                reasoning.clone(),
                responder,
                temperature,
            ))),
            Edge::Routed(routing::after_specialist),
        )
        .step(
            routing::ANALYTICS,
            SpecialistStep::new(Arc::new(AnalyticsSpecialist::new(
                reasoning.clone(),
                responder,
                temperature,
            ))),
            Edge::Routed(routing::after_specialist),
        )
        .step(
            routing::SUMMARIZE,
            Summarize::new(
                reasoning.clone(),
                config.summarizer_model.as_str(),
                temperature,
            ),
            Edge::Static(Transition::End),
        )
        .build()
}
