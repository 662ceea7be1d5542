//! Pure routing functions over the conversation state
//!
//! These are the only conditional edges in the fixed topology. Each is total:
//! every reachable state maps to a step name or the terminal sentinel.

use crate::{
    graph::Transition,
    state::{AgentType, ConversationState},
};

/// Step names for the fixed topology
pub const LOAD_CONTEXT: &str = "load_context";
pub const CLASSIFY: &str = "classify";
pub const LOAD_TASKS: &str = "load_tasks";
pub const TASK_CREATION: &str = "task_creation";
pub const PLANNING: &str = "planning";
pub const EXECUTION_COACH: &str = "execution_coach";
pub const ADAPTATION: &str = "adaptation";
pub const ANALYTICS: &str = "analytics";
pub const SUMMARIZE: &str = "summarize";

/// A conversation is summarized once its log exceeds this many messages.
pub const SUMMARY_THRESHOLD: usize = 6;

/// Specialists that need the aggregate task list before they run
fn needs_task_list(agent: AgentType) -> bool {
    matches!(
        agent,
        AgentType::Planning | AgentType::ExecutionCoach | AgentType::Analytics
    )
}

/// Map a specialist to its step. Exhaustive by construction: adding an
/// `AgentType` variant without a route is a compile error.
pub fn dispatch(agent: AgentType) -> &'static str {
    match agent {
        AgentType::TaskCreation => TASK_CREATION,
        AgentType::Planning => PLANNING,
        AgentType::ExecutionCoach => EXECUTION_COACH,
        AgentType::Adaptation => ADAPTATION,
        AgentType::Analytics => ANALYTICS,
    }
}

/// After classification: no route means the turn is done; specialists that
/// need the task list get it loaded first unless it is already cached.
pub fn after_classify(state: &ConversationState) -> Transition {
    let Some(agent) = state.active_agent else {
        return Transition::End;
    };
    if needs_task_list(agent) && state.tasks.is_none() {
        return Transition::To(LOAD_TASKS);
    }
    Transition::To(dispatch(agent))
}

/// After the task list is loaded, dispatch to the selected specialist.
pub fn after_load_tasks(state: &ConversationState) -> Transition {
    Transition::To(dispatch(
        state.active_agent.unwrap_or(AgentType::TaskCreation),
    ))
}

/// After a specialist: terminal unless a response exists and the log has
/// grown past the summarization threshold.
pub fn after_specialist(state: &ConversationState) -> Transition {
    if state.agent_response.is_some() && state.messages.len() > SUMMARY_THRESHOLD {
        return Transition::To(SUMMARIZE);
    }
    Transition::End
}
