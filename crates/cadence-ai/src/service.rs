//! The reasoning-service contract

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{Completion, CompletionRequest},
};

/// Abstract boundary to an LLM-backed responder.
///
/// Implementations may fail transiently; callers that need resilience wrap
/// the service in [`crate::retry::Retry`].
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Run a single completion request
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}
