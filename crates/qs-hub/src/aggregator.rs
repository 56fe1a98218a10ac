//! # Event aggregator
//!
//! Folds the unordered, possibly-repeating stream of lifecycle events
//! into per-query records. Each side effect of a merge (index update,
//! persistence, notification) is isolated so one failing dependency
//! cannot block the others.

use crate::notify::ChangeNotifier;
use crate::sink::EventSink;
use crate::store::QueryStore;
use qs_core::QueryEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct QueryAggregator {
    store: Arc<QueryStore>,
    sink: Arc<dyn EventSink>,
    notifier: ChangeNotifier,
    events_processed: AtomicU64,
}

impl QueryAggregator {
    pub fn new(store: Arc<QueryStore>, sink: Arc<dyn EventSink>, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            sink,
            notifier,
            events_processed: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    /// Merge one event into its query's record, then update the
    /// indices, hand the raw event to the persistence sink and publish
    /// the new snapshot.
    ///
    /// Events for the same query id are applied strictly in arrival
    /// order under the record's mutex; events for different ids do not
    /// contend. The sink call runs on its own task, outside the lock.
    pub async fn process_event(&self, event: QueryEvent) {
        let slot = self.store.slot(&event.query_id).await;
        let snapshot = {
            let mut record = slot.lock().await;
            record.apply(event.clone());
            record.clone()
        };

        self.store.index_event(&event).await;
        self.events_processed.fetch_add(1, Ordering::Relaxed);

        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.persist(&event).await {
                tracing::warn!("event sink failed for query {}: {}", event.query_id, e);
            }
        });

        self.notifier.publish(snapshot);
    }
}
