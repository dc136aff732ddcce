//! HTTP client for the Car Finder chat and alerts endpoints

use serde::de::DeserializeOwned;

use crate::{
    error::{Error, Result},
    stream::{EventStream, frame_events},
    types::{
        Alert, AlertStats, CONVERSATION_ID_HEADER, ChatRequest, ConversationId, FeedQuery,
        HistoryEntry, MarkViewed,
    },
};

/// Default server address for local development
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// An open chat response: the conversation id header plus the event stream
pub struct ChatResponse {
    /// Server-assigned id, if the response carried one
    pub conversation_id: Option<ConversationId>,
    /// Lazy, single-pass stream of decoded events
    pub events: EventStream,
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatResponse")
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}

/// Car Finder API client
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for a server such as `http://localhost:8000`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server url must start with http:// or https://, got {:?}",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat message and open the response event stream.
    ///
    /// Fails before any data is read if the server answers with a
    /// non-success status.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat/", self.base_url);
        tracing::debug!(
            "POST {} (conversation: {})",
            url,
            request
                .conversation_id
                .as_ref()
                .map(ConversationId::as_str)
                .unwrap_or("new")
        );

        let response = self
            .client
            .post(&url)
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;

        let conversation_id = response
            .headers()
            .get(CONVERSATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(ConversationId::new);

        if conversation_id.is_none() {
            tracing::debug!("Chat response carried no {} header", CONVERSATION_ID_HEADER);
        }

        Ok(ChatResponse {
            conversation_id,
            events: Box::pin(frame_events(response.bytes_stream())),
        })
    }

    /// Fetch the stored transcript of a conversation
    pub async fn chat_history(&self, conversation_id: &ConversationId) -> Result<Vec<HistoryEntry>> {
        let url = format!("{}/api/chat/history/{}", self.base_url, conversation_id);
        self.get_json(self.client.get(&url)).await
    }

    /// Fetch one page of the alerts feed
    pub async fn alerts_feed(&self, query: &FeedQuery) -> Result<Vec<Alert>> {
        let url = format!("{}/api/alerts/feed", self.base_url);
        let query = query.clone().normalized();
        self.get_json(self.client.get(&url).query(&query)).await
    }

    /// Mark an alert as viewed
    pub async fn mark_alert_viewed(&self, alert_id: &str) -> Result<MarkViewed> {
        let url = format!("{}/api/alerts/{}/mark-viewed", self.base_url, alert_id);
        self.get_json(self.client.post(&url)).await
    }

    /// Fetch alert counters, optionally for a single user
    pub async fn alert_stats(&self, user_id: Option<&str>) -> Result<AlertStats> {
        let url = format!("{}/api/alerts/stats", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(user_id) = user_id {
            builder = builder.query(&[("user_id", user_id)]);
        }
        self.get_json(builder).await
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Unexpected response body: {}", e);
            Error::UnexpectedResponse(e.to_string())
        })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::status(status.as_u16(), body))
}
