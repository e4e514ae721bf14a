use crate::tools::ToolSchema;
use crate::types::{Message, ModelReply};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A wrapper around any `ModelCaller` that retries transient failures
/// with exponential back-off.
///
/// The controller itself never retries; wrapping the collaborator is how a
/// caller opts in.
pub struct RetryingModel {
    inner:       Arc<dyn super::ModelCaller>,
    max_retries: u32,
    base_delay:  Duration,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn super::ModelCaller>, max_retries: u32) -> Self {
        Self { inner, max_retries, base_delay: Duration::from_secs(1) }
    }

    /// Overrides the first back-off delay (doubled on every attempt).
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn is_auth_error(err: &str) -> bool {
        let lower = err.to_lowercase();
        lower.contains("401")
            || lower.contains("403")
            || lower.contains("authentication")
            || lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("invalid api key")
            || lower.contains("api_key_invalid")
    }

    fn is_rate_limit_error(err: &str) -> bool {
        let lower = err.to_lowercase();
        lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("resource_exhausted")
            || lower.contains("quota")
    }

    fn delay_for(&self, attempt: u32, rate_limited: bool) -> Duration {
        // Rate limits start from a longer wait
        let base = if rate_limited { self.base_delay.saturating_mul(5) } else { self.base_delay };
        std::cmp::min(base.saturating_mul(2u32.saturating_pow(attempt)), Duration::from_secs(60))
    }
}

#[async_trait]
impl super::ModelCaller for RetryingModel {
    async fn call(
        &self,
        messages: &[Message],
        tools:    &[ToolSchema],
        model:    &str,
    ) -> Result<ModelReply, String> {
        let mut last_err = String::new();
        let mut rate_limited = false;

        for attempt in 0..=self.max_retries {
            match self.inner.call(messages, tools, model).await {
                Ok(reply) => return Ok(reply),
                Err(e) if Self::is_auth_error(&e) => {
                    tracing::error!(error = %e, "model auth error — not retrying");
                    return Err(e);
                }
                Err(e) => {
                    let limited = Self::is_rate_limit_error(&e);
                    rate_limited |= limited;
                    last_err = e;

                    if attempt < self.max_retries {
                        let wait = self.delay_for(attempt, limited);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max     = self.max_retries,
                            wait_ms = wait.as_millis() as u64,
                            error   = %last_err,
                            "model transient error — retrying"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        let prefix = if rate_limited {
            "Model rate limit exceeded"
        } else {
            "Model failed"
        };

        Err(format!(
            "{} after {} retries — last error: {}",
            prefix, self.max_retries, last_err
        ))
    }
}
