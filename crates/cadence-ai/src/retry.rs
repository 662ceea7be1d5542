//! Retry decorator for reasoning-service calls

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::Result,
    service::ReasoningService,
    types::{Completion, CompletionRequest},
};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Wraps a reasoning service with exponential-backoff retries.
///
/// Only errors classified retryable by [`crate::Error::is_retryable`] are
/// retried; everything else surfaces immediately.
pub struct Retry<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: ReasoningService> Retry<S> {
    /// Wrap a service with the given retry configuration
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<S: ReasoningService> ReasoningService for Retry<S> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(completion) => return Ok(completion),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    let delay = self.config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Completion failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;

    /// A service that fails a fixed number of times before succeeding.
    struct Flaky {
        failures: Mutex<u32>,
        error_status: u16,
    }

    #[async_trait]
    impl ReasoningService for Flaky {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::api(self.error_status, "try again"));
            }
            Ok(Completion::from_text("ok"))
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let service = Retry::new(
            Flaky {
                failures: Mutex::new(2),
                error_status: 503,
            },
            fast_config(),
        );
        let result = service
            .complete(CompletionRequest::new("test", vec![]))
            .await
            .unwrap();
        assert_eq!(result.text, "ok");
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_errors() {
        let service = Retry::new(
            Flaky {
                failures: Mutex::new(1),
                error_status: 401,
            },
            fast_config(),
        );
        let err = service
            .complete(CompletionRequest::new("test", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let service = Retry::new(
            Flaky {
                failures: Mutex::new(10),
                error_status: 429,
            },
            fast_config(),
        );
        let err = service
            .complete(CompletionRequest::new("test", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 429, .. }));
    }
}
