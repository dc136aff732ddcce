//! A cloneable handle for poking a chat session from other tasks.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for aborting and observing a chat session.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) is_streaming: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            is_streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the turn in flight. No-op when idle.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Claim the session for a new turn.
    ///
    /// Returns a fresh token, or `None` if a turn is already streaming.
    pub(crate) fn start_turn(&self) -> Option<CancellationToken> {
        if self
            .is_streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        Some(token)
    }

    pub(crate) fn finish_turn(&self) {
        self.is_streaming.store(false, Ordering::Release);
        self.idle_notify.notify_waiters();
    }

    /// Wait until no turn is streaming.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_streaming.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Wait until idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_streaming.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }

    /// Whether a reply is currently streaming.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_start_turn_is_exclusive() {
        let handle = SessionHandle::new();
        let token = handle.start_turn();
        assert!(token.is_some());
        assert!(handle.is_streaming());
        assert!(handle.start_turn().is_none());

        handle.finish_turn();
        assert!(!handle.is_streaming());
        assert!(handle.start_turn().is_some());
    }

    #[test]
    fn test_abort_cancels_current_token() {
        let handle = SessionHandle::new();
        let token = handle.start_turn().unwrap();
        handle.clone().abort();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_new_turn_gets_fresh_token() {
        let handle = SessionHandle::new();
        let first = handle.start_turn().unwrap();
        handle.abort();
        handle.finish_turn();

        let second = handle.start_turn().unwrap();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_for_idle() {
        let handle = SessionHandle::new();
        assert!(handle.wait_for_idle_timeout(Duration::from_millis(10)).await);

        handle.start_turn().unwrap();
        assert!(!handle.wait_for_idle_timeout(Duration::from_millis(10)).await);

        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait_for_idle().await });
        tokio::task::yield_now().await;
        handle.finish_turn();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
