//! Shared test doubles for the workflow crate

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cadence_ai::{Completion, CompletionRequest, ReasoningService};
use parking_lot::Mutex;

use crate::domain::{Task, TaskPatch, TaskService, User};
use crate::error::{Error, Result};

/// Replays canned completions and records every request it sees.
pub(crate) struct Scripted {
    responses: Mutex<VecDeque<cadence_ai::Result<String>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    pub(crate) calls: AtomicUsize,
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    active: AtomicUsize,
    pub(crate) max_active: AtomicUsize,
}

impl Scripted {
    fn empty() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Answer with the given texts, in order; error once exhausted.
    pub(crate) fn replies(texts: &[&str]) -> Self {
        let mut scripted = Self::empty();
        scripted.responses =
            Mutex::new(texts.iter().map(|t| Ok(t.to_string())).collect());
        scripted
    }

    /// Answer every request with the same text.
    pub(crate) fn always(text: &str) -> Self {
        let mut scripted = Self::empty();
        scripted.fallback = Some(text.to_string());
        scripted
    }

    /// Fail every request.
    pub(crate) fn failing() -> Self {
        Self::empty()
    }

    /// Sleep before answering, to simulate a slow collaborator.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ReasoningService for Scripted {
    async fn complete(&self, request: CompletionRequest) -> cadence_ai::Result<Completion> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let next = self.responses.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(Completion::from_text(text)),
            Some(Err(e)) => Err(e),
            None => match &self.fallback {
                Some(text) => Ok(Completion::from_text(text.clone())),
                None => Err(cadence_ai::Error::EmptyResponse),
            },
        }
    }
}

/// A task service whose every operation fails.
pub(crate) struct FailingTasks;

#[async_trait]
impl TaskService for FailingTasks {
    async fn fetch_user(&self, _user_id: &str) -> Result<Option<User>> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn fetch_task(&self, _task_id: &str, _user_id: &str) -> Result<Option<Task>> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn fetch_tasks(&self, _user_id: &str) -> Result<Vec<Task>> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn create_task(&self, _task: Task) -> Result<Task> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn update_task(
        &self,
        _task_id: &str,
        _user_id: &str,
        _patch: TaskPatch,
    ) -> Result<Option<Task>> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn update_many_tasks(
        &self,
        _user_id: &str,
        _updates: Vec<(String, TaskPatch)>,
    ) -> Result<usize> {
        Err(Error::Store("database unavailable".into()))
    }
    async fn create_subtasks(
        &self,
        _parent_id: &str,
        _user_id: &str,
        _subtasks: Vec<Task>,
    ) -> Result<Vec<Task>> {
        Err(Error::Store("database unavailable".into()))
    }
}

/// A user with an empty profile.
pub(crate) fn demo_user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: Some("Dana".to_string()),
        psych_profile: None,
    }
}
