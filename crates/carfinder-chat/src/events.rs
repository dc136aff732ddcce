//! Session event types

use carfinder_api::ConversationId;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::progress::ProgressFlags;

/// Events broadcast while a chat session runs a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user message was recorded and the request is being sent
    TurnStart { user_message: Message },

    /// The server assigned the conversation id for this session
    ConversationAssigned { conversation_id: ConversationId },

    /// The streaming reply changed
    MessageUpdate { message: Message },

    /// One or more progress flags flipped
    ProgressChanged { flags: ProgressFlags },

    /// The reply finished normally
    MessageEnd { message: Message },

    /// The stream failed; `message` holds the replacement text
    TurnFailed { message: Message, error: String },

    /// The turn was aborted; `message` holds whatever arrived
    TurnCancelled { message: Message },
}

impl ChatEvent {
    /// Check if this event ends a turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChatEvent::MessageEnd { .. }
                | ChatEvent::TurnFailed { .. }
                | ChatEvent::TurnCancelled { .. }
        )
    }
}
