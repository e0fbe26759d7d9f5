use futures::{Stream, stream};
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::broadcast::{self, error::RecvError};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Contacts;

const FEED_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// ChangeEvent
///
/// One row-level change on the `contacts` table, pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Contacts,
}

/// ContactsFeed
///
/// Fan-out of contacts changes. Cloning shares the same channel.
#[derive(Clone)]
pub struct ContactsFeed {
    tx: broadcast::Sender<ChangeEvent>,
    live: Arc<AtomicUsize>,
}

impl Default for ContactsFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactsFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tx,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opens a subscription. It stays registered until the handle is dropped.
    pub fn subscribe(&self) -> Subscription {
        self.live.fetch_add(1, Ordering::SeqCst);
        Subscription {
            rx: self.tx.subscribe(),
            live: Arc::clone(&self.live),
        }
    }

    /// Publishes one event; returns how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // A send error only means nobody is listening.
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::debug!(delivered, "contacts change published");
        delivered
    }

    /// Number of subscription handles currently alive.
    pub fn live_subscribers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Subscription
///
/// Scoped handle on the contacts feed. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    live: Arc<AtomicUsize>,
}

impl Subscription {
    /// Next event, or `None` once the feed has been closed. A subscriber that falls
    /// behind skips the events it missed rather than failing.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "contacts subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Converts the handle into a stream; the subscription is released when the
    /// stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        stream::unfold(self, |mut sub| async move {
            let event = sub.recv().await?;
            Some((event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
