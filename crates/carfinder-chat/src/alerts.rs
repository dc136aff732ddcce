//! Background polling of the alerts feed.
//!
//! The poller fetches immediately, then once per interval, and publishes the
//! latest [`AlertSnapshot`] on a `watch` channel. A failed poll keeps the
//! previous alerts and records the error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carfinder_api::{Alert, ChatClient, FeedQuery};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default time between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Anything that can list alerts
#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn fetch_alerts(&self, query: &FeedQuery) -> carfinder_api::Result<Vec<Alert>>;
}

#[async_trait]
impl AlertSource for ChatClient {
    async fn fetch_alerts(&self, query: &FeedQuery) -> carfinder_api::Result<Vec<Alert>> {
        self.alerts_feed(query).await
    }
}

/// Latest known state of the feed
#[derive(Debug, Clone, Default)]
pub struct AlertSnapshot {
    pub alerts: Vec<Alert>,
    /// Time of the last successful fetch
    pub fetched_at: Option<DateTime<Utc>>,
    /// Error from the most recent poll, cleared on success
    pub last_error: Option<String>,
}

impl AlertSnapshot {
    pub fn unseen(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_unseen()).count()
    }
}

/// Periodic alerts fetcher
pub struct AlertPoller {
    source: Arc<dyn AlertSource>,
    query: FeedQuery,
    interval: Duration,
}

impl AlertPoller {
    pub fn new(source: Arc<dyn AlertSource>, interval: Duration) -> Self {
        Self {
            source,
            query: FeedQuery::default(),
            interval,
        }
    }

    /// Set the feed query used for every poll
    pub fn with_query(mut self, query: FeedQuery) -> Self {
        self.query = query.normalized();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch once, folding the result into `previous`
    pub async fn poll_once(&self, previous: &AlertSnapshot) -> AlertSnapshot {
        match self.source.fetch_alerts(&self.query).await {
            Ok(alerts) => {
                tracing::debug!("Fetched {} alerts", alerts.len());
                AlertSnapshot {
                    alerts,
                    fetched_at: Some(Utc::now()),
                    last_error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Alerts poll failed: {}", e);
                AlertSnapshot {
                    alerts: previous.alerts.clone(),
                    fetched_at: previous.fetched_at,
                    last_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Start polling on a background task until `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> (watch::Receiver<AlertSnapshot>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(AlertSnapshot::default());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let previous = tx.borrow().clone();
                let snapshot = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    snapshot = self.poll_once(&previous) => snapshot,
                };

                if tx.send(snapshot).is_err() {
                    tracing::debug!("Alerts receiver dropped, stopping poller");
                    break;
                }
            }
        });

        (rx, task)
    }
}
