//! Directed-graph workflow executor
//!
//! A workflow is a set of named steps wired by edges. Each step consumes the
//! full state and returns a partial update; edges are either static or a pure
//! routing function over the post-merge state. Execution is strictly
//! sequential and bounded.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::WorkflowEvent,
    state::{ConversationState, StateUpdate},
};

/// One node in the workflow graph.
///
/// Steps never raise: any internal failure must be reported through the
/// update's `error` field so the turn still reaches a terminal decision.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, state: &ConversationState) -> StateUpdate;
}

/// Where execution goes after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the named step
    To(&'static str),
    /// Stop; the terminal sentinel is not a step
    End,
}

/// How a step's successor is chosen
pub enum Edge {
    /// Unconditional successor
    Static(Transition),
    /// Pure routing function over the post-merge state
    Routed(fn(&ConversationState) -> Transition),
}

struct Node {
    step: Box<dyn Step>,
    edge: Edge,
}

/// A compiled workflow graph
pub struct Workflow {
    start: &'static str,
    nodes: HashMap<&'static str, Node>,
    max_steps: usize,
    events: broadcast::Sender<WorkflowEvent>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("start", &self.start)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl Workflow {
    /// Start building a workflow
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }

    /// Subscribe to step-level events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// The configured step bound
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn emit(&self, event: WorkflowEvent) {
        let _ = self.events.send(event);
    }

    /// Execute the graph to completion and return the final merged state.
    ///
    /// Intermediate states are only visible to subsequent steps; the caller
    /// observes nothing until the terminal sentinel is reached.
    pub async fn run(&self, mut state: ConversationState) -> Result<ConversationState> {
        let mut current = self.start;
        let mut steps_run = 0usize;

        loop {
            let node = self
                .nodes
                .get(current)
                .ok_or_else(|| Error::UnknownStep(current.to_string()))?;

            steps_run += 1;
            if steps_run > self.max_steps {
                return Err(Error::StepBoundExceeded {
                    limit: self.max_steps,
                });
            }

            tracing::debug!(step = current, "running workflow step");
            self.emit(WorkflowEvent::StepStart {
                step: current.to_string(),
            });

            let update = node.step.run(&state).await;
            let step_error = update.error.clone();
            state.apply(update);

            self.emit(WorkflowEvent::StepEnd {
                step: current.to_string(),
                error: step_error,
            });

            let next = match &node.edge {
                Edge::Static(transition) => *transition,
                Edge::Routed(route) => route(&state),
            };

            match next {
                Transition::End => {
                    self.emit(WorkflowEvent::WorkflowEnd { steps: steps_run });
                    return Ok(state);
                }
                Transition::To(name) => current = name,
            }
        }
    }
}

/// Builder for [`Workflow`]
#[derive(Default)]
pub struct WorkflowBuilder {
    start: Option<&'static str>,
    nodes: Vec<(&'static str, Node)>,
    max_steps: Option<usize>,
    events: Option<broadcast::Sender<WorkflowEvent>>,
}

impl WorkflowBuilder {
    /// Add a named step with its outgoing edge
    pub fn step(mut self, name: &'static str, step: impl Step + 'static, edge: Edge) -> Self {
        self.nodes.push((
            name,
            Node {
                step: Box::new(step),
                edge,
            },
        ));
        self
    }

    /// Set the designated start step
    pub fn start(mut self, name: &'static str) -> Self {
        self.start = Some(name);
        self
    }

    /// Override the step bound (defaults to twice the node count)
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Emit events through an existing channel instead of a private one
    pub fn events(mut self, events: broadcast::Sender<WorkflowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the wiring and compile the workflow
    pub fn build(self) -> Result<Workflow> {
        let mut nodes = HashMap::new();
        for (name, node) in self.nodes {
            if nodes.insert(name, node).is_some() {
                return Err(Error::Other(format!("duplicate workflow step: {name}")));
            }
        }

        let start = self
            .start
            .ok_or_else(|| Error::Other("workflow has no start step".to_string()))?;
        if !nodes.contains_key(start) {
            return Err(Error::UnknownStep(start.to_string()));
        }

        // Static edges can be checked now; routed edges are checked as they fire.
        for node in nodes.values() {
            if let Edge::Static(Transition::To(target)) = node.edge {
                if !nodes.contains_key(target) {
                    return Err(Error::UnknownStep(target.to_string()));
                }
            }
        }

        let max_steps = self.max_steps.unwrap_or(nodes.len() * 2);
        let events = self
            .events
            .unwrap_or_else(|| broadcast::channel(256).0);

        Ok(Workflow {
            start,
            nodes,
            max_steps,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatMessage, MessageUpdate};

    /// A step that appends one message with fixed content.
    struct Append(&'static str);

    #[async_trait]
    impl Step for Append {
        async fn run(&self, _state: &ConversationState) -> StateUpdate {
            StateUpdate {
                messages: vec![MessageUpdate::Upsert(ChatMessage::user(self.0))],
                ..Default::default()
            }
        }
    }

    /// A step that does nothing.
    struct Noop;

    #[async_trait]
    impl Step for Noop {
        async fn run(&self, _state: &ConversationState) -> StateUpdate {
            StateUpdate::default()
        }
    }

    fn contents(state: &ConversationState) -> Vec<&str> {
        state.messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_linear_execution_in_order() {
        let workflow = Workflow::builder()
            .start("a")
            .step("a", Append("first"), Edge::Static(Transition::To("b")))
            .step("b", Append("second"), Edge::Static(Transition::End))
            .build()
            .unwrap();

        let state = workflow.run(ConversationState::new("u1")).await.unwrap();
        assert_eq!(contents(&state), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_routed_edge_sees_merged_state() {
        fn route(state: &ConversationState) -> Transition {
            if state.messages.is_empty() {
                Transition::End
            } else {
                Transition::To("b")
            }
        }

        let workflow = Workflow::builder()
            .start("a")
            .step("a", Append("first"), Edge::Routed(route))
            .step("b", Append("second"), Edge::Static(Transition::End))
            .build()
            .unwrap();

        // The routing function observes the message appended by "a".
        let state = workflow.run(ConversationState::new("u1")).await.unwrap();
        assert_eq!(contents(&state), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_cycle_hits_step_bound() {
        fn forever(_state: &ConversationState) -> Transition {
            Transition::To("a")
        }

        let workflow = Workflow::builder()
            .start("a")
            .step("a", Noop, Edge::Routed(forever))
            .build()
            .unwrap();

        let err = workflow.run(ConversationState::new("u1")).await.unwrap_err();
        assert!(matches!(err, Error::StepBoundExceeded { limit: 2 }));
    }

    #[tokio::test]
    async fn test_routed_edge_to_unknown_step_fails() {
        fn bogus(_state: &ConversationState) -> Transition {
            Transition::To("nowhere")
        }

        let workflow = Workflow::builder()
            .start("a")
            .step("a", Noop, Edge::Routed(bogus))
            .build()
            .unwrap();

        let err = workflow.run(ConversationState::new("u1")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownStep(name) if name == "nowhere"));
    }

    #[test]
    fn test_build_rejects_unknown_static_target() {
        let err = Workflow::builder()
            .start("a")
            .step("a", Noop, Edge::Static(Transition::To("missing")))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStep(name) if name == "missing"));
    }

    #[test]
    fn test_build_rejects_duplicate_steps() {
        let err = Workflow::builder()
            .start("a")
            .step("a", Noop, Edge::Static(Transition::End))
            .step("a", Noop, Edge::Static(Transition::End))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[tokio::test]
    async fn test_events_trace_visited_steps() {
        let workflow = Workflow::builder()
            .start("a")
            .step("a", Append("x"), Edge::Static(Transition::To("b")))
            .step("b", Noop, Edge::Static(Transition::End))
            .build()
            .unwrap();

        let mut rx = workflow.subscribe();
        workflow.run(ConversationState::new("u1")).await.unwrap();

        let mut visited = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let WorkflowEvent::StepStart { step } = event {
                visited.push(step);
            }
        }
        assert_eq!(visited, vec!["a", "b"]);
    }
}
