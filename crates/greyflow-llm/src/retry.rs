use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use greyflow_core::config::RetryConfig;
use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::TextGenerator;
use greyflow_core::types::*;

/// A text generator that retries transient failures with jittered backoff.
pub struct RetryingGenerator {
    inner: Box<dyn TextGenerator>,
    retry_config: RetryConfig,
}

impl RetryingGenerator {
    pub fn new(inner: Box<dyn TextGenerator>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

fn is_retryable(e: &GreyflowError) -> bool {
    match e {
        GreyflowError::LlmRequest(msg) => {
            msg.contains("(429)")
                || msg.contains("(500)")
                || msg.contains("(502)")
                || msg.contains("(503)")
                || msg.contains("timed out")
                || msg.contains("Network error")
        }
        _ => false,
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    // Add jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl TextGenerator for RetryingGenerator {
    fn generate(
        &self,
        endpoint: &str,
        messages: Vec<ChatMessage>,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> BoxFuture<'_, Result<String>> {
        let endpoint = endpoint.to_string();
        let system_prompt = system_prompt.map(str::to_string);
        let model = model.map(str::to_string);

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;
            let mut attempt = 0;
            loop {
                let result = self
                    .inner
                    .generate(
                        &endpoint,
                        messages.clone(),
                        system_prompt.as_deref(),
                        model.as_deref(),
                    )
                    .await;

                match result {
                    Err(e) if is_retryable(&e) && attempt < max_retries => {
                        let backoff = calculate_backoff(attempt, &self.retry_config);
                        warn!(
                            attempt = attempt + 1,
                            max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "Retrying chat request"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    other => return other,
                }
            }
        })
    }
}
