//! Action-item executor
//!
//! Specialists only propose side effects; applying them to the task store is
//! a collaborator concern, so it lives here rather than in the engine crate.

use std::sync::Arc;

use cadence_agent::{ActionItem, ActionType, Result, Task, TaskPatch, TaskService};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskPayload {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PatchPayload {
    title: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    stage: Option<String>,
    completed: Option<bool>,
    deadline: Option<String>,
    estimated_minutes: Option<u32>,
}

impl PatchPayload {
    fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title,
            description: self.description,
            priority: self.priority,
            stage: self.stage,
            completed: self.completed,
            deadline: self.deadline,
            estimated_minutes: self.estimated_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskPayload {
    task_id: String,
    #[serde(flatten)]
    patch: PatchPayload,
}

#[derive(Debug, Deserialize)]
struct UpdateManyPayload {
    updates: Vec<UpdateTaskPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubtasksPayload {
    #[serde(alias = "taskId")]
    parent_id: String,
    subtasks: Vec<SubtaskPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtaskPayload {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    estimated_minutes: Option<u32>,
}

/// Applies a turn's proposed action items to the task store
pub struct ActionExecutor {
    tasks: Arc<dyn TaskService>,
}

impl ActionExecutor {
    pub fn new(tasks: Arc<dyn TaskService>) -> Self {
        Self { tasks }
    }

    /// Execute every item, returning a human-readable outcome per item.
    /// Malformed payloads are skipped, not fatal.
    pub async fn execute(&self, user_id: &str, items: &[ActionItem]) -> Result<Vec<String>> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.execute_one(user_id, item).await?);
        }
        Ok(outcomes)
    }

    async fn execute_one(&self, user_id: &str, item: &ActionItem) -> Result<String> {
        match item.action_type {
            ActionType::CreateTask => {
                let Ok(payload) =
                    serde_json::from_value::<CreateTaskPayload>(item.payload.clone())
                else {
                    return Ok(skipped(item));
                };
                let mut task = Task::new(user_id, payload.title);
                task.description = payload.description;
                if let Some(priority) = payload.priority {
                    task.priority = priority;
                }
                task.deadline = payload.deadline;
                let created = self.tasks.create_task(task).await?;
                Ok(format!("created task \"{}\"", created.title))
            }
            ActionType::CreateSubtasks => {
                let Ok(payload) =
                    serde_json::from_value::<CreateSubtasksPayload>(item.payload.clone())
                else {
                    return Ok(skipped(item));
                };
                let subtasks = payload
                    .subtasks
                    .into_iter()
                    .map(|s| {
                        let mut task = Task::new(user_id, s.title);
                        task.description = s.description;
                        if let Some(priority) = s.priority {
                            task.priority = priority;
                        }
                        task.estimated_minutes = s.estimated_minutes;
                        task
                    })
                    .collect();
                let created = self
                    .tasks
                    .create_subtasks(&payload.parent_id, user_id, subtasks)
                    .await?;
                Ok(format!("created {} subtasks", created.len()))
            }
            ActionType::UpdateTask => {
                let Ok(payload) =
                    serde_json::from_value::<UpdateTaskPayload>(item.payload.clone())
                else {
                    return Ok(skipped(item));
                };
                match self
                    .tasks
                    .update_task(&payload.task_id, user_id, payload.patch.into_patch())
                    .await?
                {
                    Some(task) => Ok(format!("updated task \"{}\"", task.title)),
                    None => Ok(format!("task {} not found", payload.task_id)),
                }
            }
            ActionType::UpdateManyTasks => {
                let Ok(payload) =
                    serde_json::from_value::<UpdateManyPayload>(item.payload.clone())
                else {
                    return Ok(skipped(item));
                };
                let updates = payload
                    .updates
                    .into_iter()
                    .map(|u| (u.task_id, u.patch.into_patch()))
                    .collect();
                let updated = self.tasks.update_many_tasks(user_id, updates).await?;
                Ok(format!("updated {updated} tasks"))
            }
            ActionType::SearchTasks => {
                let tasks = self.tasks.fetch_tasks(user_id).await?;
                Ok(format!("found {} tasks", tasks.len()))
            }
            // Advisory actions carry no store mutation; surface them as-is.
            ActionType::LogActivity
            | ActionType::ScheduleReminder
            | ActionType::ProvideMotivation
            | ActionType::GiveAdvice
            | ActionType::AskQuestion => {
                tracing::info!(action = ?item.action_type, payload = %item.payload, "advisory action");
                Ok(format!("noted {:?}", item.action_type))
            }
        }
    }
}

fn skipped(item: &ActionItem) -> String {
    tracing::warn!(action = ?item.action_type, payload = %item.payload, "malformed action payload");
    format!("skipped malformed {:?}", item.action_type)
}
