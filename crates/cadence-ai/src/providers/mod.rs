//! Reasoning-service providers

pub mod openai;

pub use openai::OpenAiProvider;
