//! Domain entities and the task-data collaborator contract
//!
//! The relational store behind these records lives elsewhere; the engine only
//! needs typed snapshots and a plain CRUD boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A user's task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// "high", "medium" or "low"
    pub priority: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<Task>>,
}

impl Task {
    /// Create a task with a fresh id and default priority
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            priority: "medium".to_string(),
            stage: None,
            completed: false,
            deadline: None,
            estimated_minutes: None,
            parent_id: None,
            children: None,
        }
    }
}

/// Partial update for a task; absent fields are unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub stage: Option<String>,
    pub completed: Option<bool>,
    pub deadline: Option<String>,
    pub estimated_minutes: Option<u32>,
}

impl TaskPatch {
    fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(priority) = &self.priority {
            task.priority = priority.clone();
        }
        if let Some(stage) = &self.stage {
            task.stage = Some(stage.clone());
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(deadline) = &self.deadline {
            task.deadline = Some(deadline.clone());
        }
        if let Some(minutes) = self.estimated_minutes {
            task.estimated_minutes = Some(minutes);
        }
    }
}

/// Coaching persona attached to a psych profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coach {
    pub name: String,
    #[serde(default)]
    pub coaching_style: Option<String>,
    #[serde(default)]
    pub directness: Option<u8>,
    #[serde(default)]
    pub encouragement_level: Option<u8>,
}

/// How the user prefers to work
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PsychProfile {
    pub productivity_time: Option<String>,
    pub task_approach: Option<String>,
    pub difficulty_preference: Option<String>,
    pub coach: Option<Coach>,
}

/// A user with their profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub psych_profile: Option<PsychProfile>,
}

/// CRUD boundary to the task/user data store.
///
/// Consumed by the context-loading steps and by the external action executor;
/// never by the engine loop itself.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn fetch_task(&self, task_id: &str, user_id: &str) -> Result<Option<Task>>;
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>>;
    async fn create_task(&self, task: Task) -> Result<Task>;
    async fn update_task(
        &self,
        task_id: &str,
        user_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>>;
    async fn update_many_tasks(
        &self,
        user_id: &str,
        updates: Vec<(String, TaskPatch)>,
    ) -> Result<usize>;
    async fn create_subtasks(
        &self,
        parent_id: &str,
        user_id: &str,
        subtasks: Vec<Task>,
    ) -> Result<Vec<Task>>;
}

/// In-memory task service, used by tests and the CLI demo
#[derive(Default)]
pub struct InMemoryTaskService {
    users: Mutex<HashMap<String, User>>,
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn put_user(&self, user: User) {
        self.users.lock().insert(user.id.clone(), user);
    }

    /// Insert or replace a task
    pub fn put_task(&self, task: Task) {
        self.tasks.lock().insert(task.id.clone(), task);
    }

    fn children_of(&self, parent_id: &str) -> Vec<Task> {
        self.tasks
            .lock()
            .values()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskService for InMemoryTaskService {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.lock().get(user_id).cloned())
    }

    async fn fetch_task(&self, task_id: &str, user_id: &str) -> Result<Option<Task>> {
        let task = {
            let tasks = self.tasks.lock();
            tasks
                .get(task_id)
                .filter(|t| t.user_id == user_id)
                .cloned()
        };
        Ok(task.map(|mut task| {
            let children = self.children_of(&task.id);
            if !children.is_empty() {
                task.children = Some(children);
            }
            task
        }))
    }

    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| t.user_id == user_id && t.parent_id.is_none())
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tasks)
    }

    async fn create_task(&self, task: Task) -> Result<Task> {
        self.tasks.lock().insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        user_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        let mut tasks = self.tasks.lock();
        match tasks.get_mut(task_id).filter(|t| t.user_id == user_id) {
            Some(task) => {
                patch.apply_to(task);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_many_tasks(
        &self,
        user_id: &str,
        updates: Vec<(String, TaskPatch)>,
    ) -> Result<usize> {
        let mut tasks = self.tasks.lock();
        let mut updated = 0;
        for (task_id, patch) in updates {
            if let Some(task) = tasks.get_mut(&task_id).filter(|t| t.user_id == user_id) {
                patch.apply_to(task);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn create_subtasks(
        &self,
        parent_id: &str,
        user_id: &str,
        subtasks: Vec<Task>,
    ) -> Result<Vec<Task>> {
        let mut created = Vec::with_capacity(subtasks.len());
        let mut tasks = self.tasks.lock();
        for mut subtask in subtasks {
            subtask.user_id = user_id.to_string();
            subtask.parent_id = Some(parent_id.to_string());
            tasks.insert(subtask.id.clone(), subtask.clone());
            created.push(subtask);
        }
        Ok(created)
    }
}
