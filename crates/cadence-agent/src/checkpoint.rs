//! Per-thread checkpoint persistence
//!
//! A checkpoint is the full conversation state for one thread, written as the
//! last action of a successful turn and reloaded at the start of the next.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    state::ConversationState,
};

/// Checkpoint load/save boundary.
///
/// Load of an unknown thread is `Ok(None)`; any I/O or decode failure is an
/// error, which the runtime treats as fatal for the turn.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>>;
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()>;
}

/// On-disk document wrapper, one file per thread
#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    thread_id: String,
    saved_at: i64,
    state: ConversationState,
}

/// File-backed checkpointer: one JSON document per thread
pub struct FileCheckpointer {
    dir: PathBuf,
}

impl FileCheckpointer {
    /// Store checkpoints under the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default checkpoint directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadence")
            .join("threads")
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        // Thread ids come from callers; keep the file name filesystem-safe.
        let safe: String = thread_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Default for FileCheckpointer {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let path = self.path_for(thread_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Checkpoint(format!("read {}: {e}", path.display())))?;
        let envelope: CheckpointEnvelope = serde_json::from_str(&content)
            .map_err(|e| Error::Checkpoint(format!("decode {}: {e}", path.display())))?;
        Ok(Some(envelope.state))
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Checkpoint(format!("create {}: {e}", self.dir.display())))?;

        let envelope = CheckpointEnvelope {
            thread_id: thread_id.to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
            state: state.clone(),
        };
        let content = serde_json::to_string_pretty(&envelope)
            .map_err(|e| Error::Checkpoint(format!("encode checkpoint: {e}")))?;

        let path = self.path_for(thread_id);
        fs::write(&path, content)
            .map_err(|e| Error::Checkpoint(format!("write {}: {e}", path.display())))?;
        tracing::debug!(thread_id, path = %path.display(), "checkpoint saved");
        Ok(())
    }
}

/// In-memory checkpointer for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryCheckpointer {
    checkpoints: Mutex<HashMap<String, ConversationState>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.checkpoints.lock().get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        self.checkpoints
            .lock()
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }
}
