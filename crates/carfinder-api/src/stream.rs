//! Streaming event types and utilities

use crate::error::{Error, Result};
use crate::sse::FrameDecoder;
use crate::types::FramePayload;
use async_stream::stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Side effect sent after preferences were persisted server-side
pub const PREFERENCES_SAVED: &str = "preferences_saved";

/// Side effect sent as the last frame of a response
pub const END: &str = "end";

/// A decoded unit of the chat stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text to append to the streaming assistant message
    ContentDelta { text: String },
    /// Named server-side state change
    SideEffect { name: String },
    /// The completion backend reported a failure in-band
    ServerError { message: String },
    /// Well-formed payload carrying nothing we understand
    Unknown,
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::ContentDelta { text: text.into() }
    }

    pub fn side_effect(name: impl Into<String>) -> Self {
        Self::SideEffect { name: name.into() }
    }

    /// Check if this is the server's end-of-response marker
    pub fn is_end(&self) -> bool {
        matches!(self, StreamEvent::SideEffect { name } if name == END)
    }
}

/// Decode one frame payload into the events it carries.
///
/// A payload with both `content` and `event` yields the delta first. A JSON
/// object with none of the known keys yields [`StreamEvent::Unknown`].
pub fn decode_payload(payload: &str) -> Result<Vec<StreamEvent>> {
    let parsed: FramePayload = serde_json::from_str(payload)?;

    let mut events = Vec::with_capacity(2);
    if let Some(text) = parsed.content.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::ContentDelta { text });
    }
    if let Some(name) = parsed.event.filter(|n| !n.is_empty()) {
        events.push(StreamEvent::SideEffect { name });
    }
    if let Some(message) = parsed.error {
        events.push(StreamEvent::ServerError { message });
    }
    if events.is_empty() {
        events.push(StreamEvent::Unknown);
    }
    Ok(events)
}

/// A stream of decoded chat events.
///
/// Yields `Err` at most once, for a transport failure, and then ends.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Turn a stream of raw body chunks into a lazy stream of [`StreamEvent`]s.
///
/// Malformed frames are logged and skipped; they never end the stream.
pub fn frame_events<S, B, E>(chunks: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    stream! {
        let mut chunks = std::pin::pin!(chunks);
        let mut decoder = FrameDecoder::new();
        let mut skipped = 0usize;

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let e: Error = e.into();
                    tracing::error!("Chat stream read failed: {}", e);
                    yield Err(e);
                    return;
                }
            };

            for payload in decoder.push(chunk.as_ref()) {
                match decode_payload(&payload) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!("Skipping malformed frame ({}): {}", e, payload);
                    }
                }
            }
        }

        let dropped = decoder.finish();
        if dropped > 0 {
            tracing::debug!("Discarding {} bytes of unterminated trailing line", dropped);
        }
        if skipped > 0 {
            tracing::debug!("Chat stream ended with {} malformed frames skipped", skipped);
        }
    }
}
