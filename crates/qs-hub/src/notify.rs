//! # Change notifier
//!
//! Fan-out of record snapshots to an arbitrary number of subscribers
//! over a single logical channel. The aggregator's throughput is never
//! gated by a slow subscriber: publishing is a non-blocking broadcast
//! send, and a receiver that falls behind observes `Lagged` and keeps
//! going from the oldest retained snapshot.

use qs_core::QueryRecord;
use tokio::sync::broadcast;

pub struct ChangeNotifier {
    tx: broadcast::Sender<QueryRecord>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver the current snapshot to all subscribers. A publish with
    /// no subscribers is not an error.
    pub fn publish(&self, record: QueryRecord) {
        let _ = self.tx.send(record);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryRecord> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
