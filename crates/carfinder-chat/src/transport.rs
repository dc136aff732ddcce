//! Transport abstraction for opening chat streams

use std::time::Duration;

use async_trait::async_trait;
use carfinder_api::{ChatClient, ChatRequest, ConversationId, Error, EventStream, Result};
use tokio_util::sync::CancellationToken;

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
            max_retries: 0,
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

/// An opened chat response
pub struct ChatStream {
    /// Id from the response header, if any
    pub conversation_id: Option<ConversationId>,
    pub events: EventStream,
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}

/// Transport for sending one chat message and streaming the reply
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the reply stream once headers arrive
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ChatStream>;
}

/// HTTP transport backed by [`ChatClient`]
pub struct HttpTransport {
    client: ChatClient,
    retry_config: RetryConfig,
}

impl HttpTransport {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            retry_config: RetryConfig::default(),
        }
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ChatStream> {
        let mut attempt = 0u32;

        // Retries stop at the response headers. Once the stream is handed
        // back, a failure belongs to the turn.
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Aborted),
                result = self.client.send(&request) => result,
            };

            match result {
                Ok(response) => {
                    return Ok(ChatStream {
                        conversation_id: response.conversation_id,
                        events: response.events,
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.retry_config.max_retries => {
                    let delay = self.retry_config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Chat request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt + 1,
                        self.retry_config.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Aborted),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
