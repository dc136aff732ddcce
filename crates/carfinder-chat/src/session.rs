//! Chat session: drives one turn at a time through a transport

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use carfinder_api::{ChatRequest, ConversationId};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::{ConversationState, Message, MessageStatus},
    error::{Error, Result},
    events::ChatEvent,
    handle::SessionHandle,
    progress::ProgressFlags,
    reducer::StreamingMessageReducer,
    transport::Transport,
};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream ended normally
    Completed,
    /// The stream failed; the reply shows the fixed error text
    Failed { error: String },
    /// The turn was aborted through the handle
    Cancelled,
}

/// A single conversation with the assistant
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    conversation: ConversationState,
    progress: ProgressFlags,
    conversation_id: Option<ConversationId>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Create a new session
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            transport,
            conversation: ConversationState::new(),
            progress: ProgressFlags::default(),
            conversation_id: None,
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Continue a conversation the server already knows
    pub fn with_conversation_id(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting turns from other tasks
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn progress(&self) -> ProgressFlags {
        self.progress
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    /// Send a user message and stream the reply to completion.
    ///
    /// Stream and transport failures are reported through the returned
    /// [`TurnOutcome`] and the reply text. `Err` is only returned when the
    /// message was not sent at all.
    pub async fn send(&mut self, text: &str) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let cancel = self.handle.start_turn().ok_or(Error::Busy)?;

        let user_id = self.conversation.push_user(text);
        if let Some(message) = self.conversation.get(&user_id) {
            self.emit(ChatEvent::TurnStart {
                user_message: message.clone(),
            });
        }
        if self.progress.observe_input(text) {
            self.emit(ChatEvent::ProgressChanged {
                flags: self.progress,
            });
        }

        let reply_id = Message::reply_id(&user_id);
        self.conversation.begin_assistant(reply_id.as_str());

        let mut reducer = StreamingMessageReducer::new(reply_id.as_str());
        reducer.begin_send();
        let request = ChatRequest::new(text, self.conversation_id.clone());

        // Releases the session even if this future is dropped mid-turn
        let mut turn = TurnGuard {
            session: self,
            reply_id,
        };
        Ok(turn.run_turn(reducer, request, cancel).await)
    }

    async fn run_turn(
        &mut self,
        mut reducer: StreamingMessageReducer,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let opened = self.transport.open(request, cancel.clone()).await;
        let stream = match opened {
            Ok(stream) => stream,
            Err(_) if cancel.is_cancelled() => return self.cancel_turn(reducer),
            Err(e) => return self.fail_turn(reducer, e.to_string()),
        };

        if reducer.on_response(stream.conversation_id, &mut self.conversation_id) {
            if let Some(id) = self.conversation_id.clone() {
                self.emit(ChatEvent::ConversationAssigned {
                    conversation_id: id,
                });
            }
        }

        let mut events = stream.events;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancel_turn(reducer),
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let applied = reducer.apply(&event, &mut self.conversation, &mut self.progress);
                    if applied.content {
                        if let Some(message) = self.conversation.get(reducer.message_id()) {
                            self.emit(ChatEvent::MessageUpdate {
                                message: message.clone(),
                            });
                        }
                    }
                    if applied.progress {
                        self.emit(ChatEvent::ProgressChanged {
                            flags: self.progress,
                        });
                    }
                }
                Some(Err(e)) => return self.fail_turn(reducer, e.to_string()),
                None => break,
            }
        }

        let id = reducer.message_id().to_string();
        reducer.complete(&mut self.conversation);
        if let Some(message) = self.conversation.get(&id) {
            self.emit(ChatEvent::MessageEnd {
                message: message.clone(),
            });
        }
        TurnOutcome::Completed
    }

    fn fail_turn(&mut self, reducer: StreamingMessageReducer, error: String) -> TurnOutcome {
        let id = reducer.message_id().to_string();
        reducer.fail(&mut self.conversation, &error);
        if let Some(message) = self.conversation.get(&id) {
            self.emit(ChatEvent::TurnFailed {
                message: message.clone(),
                error: error.clone(),
            });
        }
        TurnOutcome::Failed { error }
    }

    fn cancel_turn(&mut self, reducer: StreamingMessageReducer) -> TurnOutcome {
        let id = reducer.message_id().to_string();
        reducer.cancel(&mut self.conversation);
        if let Some(message) = self.conversation.get(&id) {
            self.emit(ChatEvent::TurnCancelled {
                message: message.clone(),
            });
        }
        TurnOutcome::Cancelled
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Holds the session for the length of one turn.
///
/// Dropping it frees the admission gate. A reply still streaming at that point
/// was abandoned with its `send` future and is frozen as cancelled.
struct TurnGuard<'a> {
    session: &'a mut ChatSession,
    reply_id: String,
}

impl Deref for TurnGuard<'_> {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        self.session
    }
}

impl DerefMut for TurnGuard<'_> {
    fn deref_mut(&mut self) -> &mut ChatSession {
        self.session
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let session = &mut *self.session;
        if session
            .conversation
            .freeze(&self.reply_id, MessageStatus::Cancelled)
        {
            tracing::debug!("Turn for {} dropped while streaming", self.reply_id);
            if let Some(message) = session.conversation.get(&self.reply_id) {
                let message = message.clone();
                session.emit(ChatEvent::TurnCancelled { message });
            }
        }
        session.handle.finish_turn();
    }
}
