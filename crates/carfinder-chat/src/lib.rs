//! carfinder-chat: Conversation runtime for the Car Finder assistant
//!
//! This crate turns the decoded reply stream into conversation state:
//! a per-turn reducer, the session that drives turns over a transport,
//! progress heuristics and the background alerts poller.

pub mod alerts;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod progress;
pub mod reducer;
pub mod session;
pub mod transport;

pub use alerts::{AlertPoller, AlertSnapshot, AlertSource, DEFAULT_POLL_INTERVAL};
pub use conversation::{
    Author, CarCard, ComparisonRow, ConversationState, Message, MessageStatus, RichContent,
    VideoRef,
};
pub use error::{Error, Result};
pub use events::ChatEvent;
pub use handle::SessionHandle;
pub use progress::ProgressFlags;
pub use reducer::{Applied, ERROR_TEXT, StreamState, StreamingMessageReducer};
pub use session::{ChatSession, TurnOutcome};
pub use transport::{ChatStream, HttpTransport, RetryConfig, Transport};
