//! Shared machinery for the live (backend-backed) stores.
//!
//! Each live subscription runs a pump task that relays backend snapshots to
//! the observer.  When the push channel fails or closes, the pump
//! resubscribes with exponential backoff; the whole cycle is published as
//! explicit [`SubscriptionHealth`] state rather than being logged and
//! forgotten.  A lost channel is never interpreted as an empty collection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::backend::{CollectionQuery, Document, DocumentBackend, SnapshotEvent};
use crate::pubsub::{Observer, Subscription};

/// State of a live subscription's push channel.
///
/// Starts `Live` (the initial subscribe is assumed to succeed); the first
/// failure moves it to `Retrying`, a successful snapshot moves it back, and
/// exhausting the retry budget parks it at `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionHealth {
    /// Snapshots are flowing.
    Live,
    /// The channel was lost; attempt `attempt` of the retry budget is
    /// pending or in progress.
    Retrying { attempt: u32 },
    /// The retry budget is exhausted.  No further snapshots will arrive.
    Stopped,
}

/// Reconnect policy for live subscriptions.
///
/// The delay doubles per consecutive failure, capped at `max_delay`; any
/// successful snapshot resets the attempt counter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Spawn the pump task backing one live subscription.
///
/// `decode` turns a raw result set into domain records (dropping malformed
/// documents, applying ordering).  The returned [`Subscription`] aborts the
/// pump on cancel/drop and carries the health watch.
pub(crate) fn spawn_snapshot_pump<T, D>(
    backend: Arc<dyn DocumentBackend>,
    collection: &'static str,
    query: CollectionQuery,
    retry: RetryPolicy,
    decode: D,
    observer: Observer<T>,
) -> Subscription
where
    T: Send + Sync + 'static,
    D: Fn(Vec<Document>) -> Vec<T> + Send + 'static,
{
    let (health_tx, health_rx) = watch::channel(SubscriptionHealth::Live);

    let handle = tokio::spawn(async move {
        let set_health = |health: SubscriptionHealth| {
            health_tx.send_if_modified(|current| {
                if *current == health {
                    false
                } else {
                    *current = health;
                    true
                }
            });
        };

        let mut attempt: u32 = 0;
        loop {
            match backend.subscribe(collection, query.clone()).await {
                Ok(mut rx) => loop {
                    match rx.recv().await {
                        Some(SnapshotEvent::Snapshot(docs)) => {
                            attempt = 0;
                            set_health(SubscriptionHealth::Live);
                            let records = decode(docs);
                            observer(&records);
                        }
                        Some(SnapshotEvent::Failed(reason)) => {
                            tracing::warn!(collection, reason = %reason, "live query lost");
                            break;
                        }
                        None => {
                            tracing::warn!(collection, "live query channel closed");
                            break;
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(collection, error = %e, "live query subscribe failed");
                }
            }

            attempt += 1;
            if attempt > retry.max_attempts {
                tracing::error!(collection, "retry budget exhausted, subscription stopped");
                set_health(SubscriptionHealth::Stopped);
                return;
            }
            set_health(SubscriptionHealth::Retrying { attempt });
            tokio::time::sleep(retry.delay(attempt)).await;
        }
    });

    Subscription::new(move || handle.abort()).with_health(health_rx)
}
