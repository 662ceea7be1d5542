//! cadence-ai: reasoning-service boundary
//!
//! This crate provides the abstract request/response contract to an
//! LLM-backed responder, an OpenAI-compatible implementation, a retry
//! decorator, and helpers for parsing structured output out of model text.

pub mod error;
pub mod providers;
pub mod retry;
pub mod service;
pub mod structured;
pub mod types;

pub use error::{Error, Result};
pub use retry::{Retry, RetryConfig};
pub use service::ReasoningService;
pub use types::*;
