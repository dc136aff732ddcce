//! Conversation state: ordered messages with at most one streaming reply.

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

/// Lifecycle of a message's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Receiving deltas
    Streaming,
    /// Frozen after a normal end of stream
    Complete,
    /// Frozen with the fixed error text
    Failed,
    /// Frozen with whatever arrived before the turn was aborted
    Cancelled,
}

impl MessageStatus {
    pub fn is_frozen(&self) -> bool {
        !matches!(self, MessageStatus::Streaming)
    }
}

/// A vehicle card shown inside a rich assistant reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarCard {
    pub id: String,
    pub name: String,
    pub price: String,
    pub mileage: String,
    pub year: String,
    pub engine: String,
    pub transmission: String,
    pub mpg: Option<String>,
    pub safety: Option<String>,
    /// Comparison row key to highlight for this car (`price`, `mpg`, ...)
    pub highlight: Option<String>,
}

impl CarCard {
    fn field(&self, key: &str) -> String {
        match key {
            "price" => self.price.clone(),
            "mileage" => self.mileage.clone(),
            "engine" => self.engine.clone(),
            "mpg" => self.mpg.clone().unwrap_or_default(),
            "safety" => self.safety.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// Embedded video reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRef {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Structured payload rendered alongside message text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichContent {
    pub cars: Vec<CarCard>,
    pub comparison: Vec<CarCard>,
    pub video: Option<VideoRef>,
    pub expandable: Option<String>,
}

/// One row of a comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub feature: &'static str,
    /// One `(value, highlighted)` cell per compared car
    pub cells: Vec<(String, bool)>,
}

/// Rows shown in every comparison table, as `(label, field key)`
pub const COMPARISON_FEATURES: [(&str, &str); 5] = [
    ("Price", "price"),
    ("Mileage", "mileage"),
    ("Engine", "engine"),
    ("Fuel Economy", "mpg"),
    ("Safety Rating", "safety"),
];

impl RichContent {
    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
            && self.comparison.is_empty()
            && self.video.is_none()
            && self.expandable.is_none()
    }

    /// Build the comparison table rows, empty if nothing is compared
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        if self.comparison.is_empty() {
            return Vec::new();
        }
        COMPARISON_FEATURES
            .iter()
            .map(|&(feature, key)| ComparisonRow {
                feature,
                cells: self
                    .comparison
                    .iter()
                    .map(|car| (car.field(key), car.highlight.as_deref() == Some(key)))
                    .collect(),
            })
            .collect()
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<RichContent>,
    pub status: MessageStatus,
    /// Creation time in unix millis
    pub timestamp: i64,
}

impl Message {
    /// Create a user message with a fresh id
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: Author::User,
            content: text.into(),
            rich_content: None,
            status: MessageStatus::Complete,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create the empty placeholder that a reply streams into
    pub fn assistant_placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: Author::Assistant,
            content: String::new(),
            rich_content: None,
            status: MessageStatus::Streaming,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Id of the assistant reply to the user message `user_id`
    pub fn reply_id(user_id: &str) -> String {
        format!("{}-assistant", user_id)
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}

/// Ordered conversation transcript
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The reply currently receiving deltas, if any
    pub fn in_progress(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_streaming())
    }

    /// Append a user message and return its id
    pub fn push_user(&mut self, text: impl Into<String>) -> String {
        let message = Message::user(text);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Append an empty streaming reply.
    ///
    /// Any reply still streaming was abandoned and is frozen as cancelled, so
    /// at most one message is ever in progress.
    pub fn begin_assistant(&mut self, id: impl Into<String>) {
        if let Some(stale) = self.messages.iter_mut().find(|m| m.is_streaming()) {
            tracing::warn!("Freezing stale streaming message {}", stale.id);
            stale.status = MessageStatus::Cancelled;
        }
        self.messages.push(Message::assistant_placeholder(id));
    }

    /// Append a delta to the streaming message `id`.
    ///
    /// Returns false if `id` is unknown or already frozen.
    pub fn append_delta(&mut self, id: &str, text: &str) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Freeze the streaming message `id` with `status`
    pub fn freeze(&mut self, id: &str, status: MessageStatus) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.status = status;
                true
            }
            None => false,
        }
    }

    /// Replace the content of the streaming message `id` and freeze it as failed
    pub fn fail(&mut self, id: &str, error_text: &str) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.content = error_text.to_string();
                message.status = MessageStatus::Failed;
                true
            }
            None => false,
        }
    }

    /// Attach structured content to any assistant message.
    ///
    /// The chat stream only carries text, so nothing in this crate fills
    /// `rich_content`. Embedders that get cards or comparisons from elsewhere
    /// attach them here.
    pub fn attach_rich_content(&mut self, id: &str, rich: RichContent) -> bool {
        match self
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.author == Author::Assistant)
        {
            Some(message) => {
                message.rich_content = Some(rich);
                true
            }
            None => false,
        }
    }

    fn streaming_mut(&mut self, id: &str) -> Option<&mut Message> {
        // The streaming reply is always at or near the end.
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.id == id)
            .filter(|m| m.is_streaming())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_grows_then_freezes() {
        let mut conv = ConversationState::new();
        let user_id = conv.push_user("hi");
        let reply = Message::reply_id(&user_id);
        conv.begin_assistant(reply.clone());

        assert!(conv.append_delta(&reply, "Hel"));
        assert!(conv.append_delta(&reply, "lo"));
        assert!(conv.freeze(&reply, MessageStatus::Complete));

        assert!(!conv.append_delta(&reply, "!"));
        let msg = conv.get(&reply).unwrap();
        assert_eq!(msg.content, "Hello");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert!(conv.in_progress().is_none());
    }

    #[test]
    fn test_user_messages_are_never_streaming() {
        let mut conv = ConversationState::new();
        let id = conv.push_user("hi");
        assert!(!conv.append_delta(&id, "x"));
        assert_eq!(conv.get(&id).unwrap().content, "hi");
    }

    #[test]
    fn test_fail_replaces_content() {
        let mut conv = ConversationState::new();
        conv.begin_assistant("r1");
        conv.append_delta("r1", "partial");
        assert!(conv.fail("r1", "error text"));
        let msg = conv.get("r1").unwrap();
        assert_eq!(msg.content, "error text");
        assert_eq!(msg.status, MessageStatus::Failed);
        assert!(!conv.fail("r1", "again"));
    }

    #[test]
    fn test_at_most_one_in_progress() {
        let mut conv = ConversationState::new();
        conv.begin_assistant("r1");
        conv.begin_assistant("r2");
        let streaming: Vec<_> = conv.messages().iter().filter(|m| m.is_streaming()).collect();
        assert_eq!(streaming.len(), 1);
        assert_eq!(conv.in_progress().unwrap().id, "r2");
        assert_eq!(conv.get("r1").unwrap().status, MessageStatus::Cancelled);
    }

    #[test]
    fn test_reply_id_suffix() {
        assert_eq!(Message::reply_id("42"), "42-assistant");
    }

    #[test]
    fn test_comparison_rows_highlight() {
        let rich = RichContent {
            comparison: vec![
                CarCard {
                    id: "1".into(),
                    name: "RAV4".into(),
                    price: "$31,000".into(),
                    mpg: Some("30".into()),
                    highlight: Some("mpg".into()),
                    ..Default::default()
                },
                CarCard {
                    id: "2".into(),
                    name: "CR-V".into(),
                    price: "$29,500".into(),
                    highlight: Some("price".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let rows = rich.comparison_rows();
        assert_eq!(rows.len(), COMPARISON_FEATURES.len());
        assert_eq!(rows[0].feature, "Price");
        assert_eq!(
            rows[0].cells,
            vec![("$31,000".to_string(), false), ("$29,500".to_string(), true)]
        );
        let fuel = rows.iter().find(|r| r.feature == "Fuel Economy").unwrap();
        assert_eq!(fuel.cells, vec![("30".to_string(), true), (String::new(), false)]);
    }

    #[test]
    fn test_attach_rich_content_only_to_assistant() {
        let mut conv = ConversationState::new();
        let user = conv.push_user("compare");
        conv.begin_assistant("r1");
        let rich = RichContent {
            expandable: Some("details".into()),
            ..Default::default()
        };
        assert!(!conv.attach_rich_content(&user, rich.clone()));
        assert!(conv.attach_rich_content("r1", rich));
        assert!(!conv.get("r1").unwrap().rich_content.as_ref().unwrap().is_empty());
    }
}
