//! Applies decoded stream events to conversation state, one turn at a time.
//!
//! A reducer lives for exactly one request:
//!
//! ```text
//! Idle -> Sending -> Streaming -> Completed | Failed | Cancelled
//! ```
//!
//! The terminal transitions consume the reducer, so it cannot be reused for
//! another request.

use carfinder_api::{ConversationId, StreamEvent};
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationState, MessageStatus};
use crate::progress::ProgressFlags;

/// Text shown in place of a reply whose stream failed
pub const ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Where a turn is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    /// Request in flight, no response yet
    Sending,
    /// Response headers received, frames arriving
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

/// What a single applied event changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub content: bool,
    pub progress: bool,
}

impl Applied {
    pub fn any(&self) -> bool {
        self.content || self.progress
    }
}

/// Reduces one response stream into the reply message `message_id`
#[derive(Debug)]
pub struct StreamingMessageReducer {
    message_id: String,
    state: StreamState,
    frames: usize,
}

impl StreamingMessageReducer {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            state: StreamState::Idle,
            frames: 0,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of events applied so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The request has been handed to the transport
    pub fn begin_send(&mut self) {
        if self.state != StreamState::Idle {
            tracing::warn!("begin_send called in state {:?}", self.state);
            return;
        }
        self.state = StreamState::Sending;
    }

    /// Response headers arrived.
    ///
    /// Stores `server_id` into `slot` if no id has been captured yet and
    /// returns true when it did. An id that disagrees with the captured one is
    /// ignored.
    pub fn on_response(
        &mut self,
        server_id: Option<ConversationId>,
        slot: &mut Option<ConversationId>,
    ) -> bool {
        self.state = StreamState::Streaming;

        let Some(id) = server_id else {
            return false;
        };
        match slot.as_ref() {
            Some(current) if *current != id => {
                tracing::warn!(
                    "Server sent conversation id {} but session is bound to {}; keeping {}",
                    id,
                    current,
                    current
                );
                false
            }
            Some(_) => false,
            None => {
                tracing::debug!("Captured conversation id {}", id);
                *slot = Some(id);
                true
            }
        }
    }

    /// Apply one decoded event
    pub fn apply(
        &mut self,
        event: &StreamEvent,
        conversation: &mut ConversationState,
        progress: &mut ProgressFlags,
    ) -> Applied {
        if self.state != StreamState::Streaming {
            tracing::debug!("Ignoring {:?} in state {:?}", event, self.state);
            return Applied::default();
        }
        self.frames += 1;

        match event {
            StreamEvent::ContentDelta { text } => Applied {
                content: conversation.append_delta(&self.message_id, text),
                progress: false,
            },
            StreamEvent::SideEffect { name } => Applied {
                content: false,
                progress: progress.observe_side_effect(name),
            },
            StreamEvent::ServerError { message } => {
                tracing::warn!("Server reported an error mid-stream: {}", message);
                Applied::default()
            }
            StreamEvent::Unknown => Applied::default(),
        }
    }

    /// Normal end of stream: freeze the reply
    pub fn complete(self, conversation: &mut ConversationState) -> StreamState {
        conversation.freeze(&self.message_id, MessageStatus::Complete);
        tracing::debug!(
            "Reply {} complete after {} events",
            self.message_id,
            self.frames
        );
        StreamState::Completed
    }

    /// Transport failure: replace the reply with [`ERROR_TEXT`]
    pub fn fail(
        self,
        conversation: &mut ConversationState,
        error: &dyn std::fmt::Display,
    ) -> StreamState {
        tracing::error!("Chat stream failed in state {:?}: {}", self.state, error);
        conversation.fail(&self.message_id, ERROR_TEXT);
        StreamState::Failed
    }

    /// Abandoned turn: keep what arrived and stop
    pub fn cancel(self, conversation: &mut ConversationState) -> StreamState {
        tracing::debug!("Reply {} cancelled in state {:?}", self.message_id, self.state);
        conversation.freeze(&self.message_id, MessageStatus::Cancelled);
        StreamState::Cancelled
    }
}
