//! # Query record store
//!
//! Thread-safe home of every [`QueryRecord`], plus additive secondary
//! indices by catalog, "catalog.schema" and "catalog.schema.table".
//!
//! Locking is layered: the outer map lock is held only long enough to
//! resolve a record's slot, and all merging for one query id happens
//! under that record's own mutex, so events for different ids never
//! contend. The index maps take separate locks and may briefly trail
//! the primary store; reads are eventually consistent, not
//! linearizable.

use qs_core::{QueryEvent, QueryRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct QueryStore {
    records: RwLock<HashMap<String, Arc<Mutex<QueryRecord>>>>,
    by_catalog: RwLock<HashMap<String, BTreeSet<String>>>,
    by_schema: RwLock<HashMap<String, BTreeSet<String>>>,
    by_table: RwLock<HashMap<String, BTreeSet<String>>>,
}

/// Point-in-time view of what the indices know.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub catalogs: Vec<String>,
    pub schemas: Vec<String>,
    pub tables: Vec<String>,
    pub total_queries: usize,
    pub catalog_query_counts: BTreeMap<String, usize>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            by_catalog: RwLock::new(HashMap::new()),
            by_schema: RwLock::new(HashMap::new()),
            by_table: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch or create the record slot for a query id.
    pub(crate) async fn slot(&self, query_id: &str) -> Arc<Mutex<QueryRecord>> {
        {
            let records = self.records.read().await;
            if let Some(slot) = records.get(query_id) {
                return slot.clone();
            }
        }
        let mut records = self.records.write().await;
        records
            .entry(query_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(QueryRecord::new(query_id))))
            .clone()
    }

    /// Record catalog/schema/table associations for an event. Additive
    /// only: an event that omits a field never retracts an earlier
    /// association.
    pub(crate) async fn index_event(&self, event: &QueryEvent) {
        let Some(catalog) = event.catalog.as_deref() else {
            return;
        };
        {
            let mut by_catalog = self.by_catalog.write().await;
            by_catalog
                .entry(catalog.to_string())
                .or_default()
                .insert(event.query_id.clone());
        }

        let Some(schema) = event.schema.as_deref() else {
            return;
        };
        let schema_key = format!("{}.{}", catalog, schema);
        {
            let mut by_schema = self.by_schema.write().await;
            by_schema
                .entry(schema_key.clone())
                .or_default()
                .insert(event.query_id.clone());
        }

        if let Some(table) = event.table_name.as_deref() {
            let mut by_table = self.by_table.write().await;
            by_table
                .entry(format!("{}.{}", schema_key, table))
                .or_default()
                .insert(event.query_id.clone());
        }
    }

    pub async fn get(&self, query_id: &str) -> Option<QueryRecord> {
        let slot = { self.records.read().await.get(query_id).cloned() };
        match slot {
            Some(slot) => Some(slot.lock().await.clone()),
            None => None,
        }
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn all_ids(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }

    pub async fn all(&self) -> Vec<QueryRecord> {
        let slots: Vec<Arc<Mutex<QueryRecord>>> =
            { self.records.read().await.values().cloned().collect() };
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            out.push(slot.lock().await.clone());
        }
        out
    }

    pub async fn by_catalog(&self, catalog: &str) -> Vec<QueryRecord> {
        let ids = {
            self.by_catalog
                .read()
                .await
                .get(catalog)
                .cloned()
                .unwrap_or_default()
        };
        self.collect(ids).await
    }

    pub async fn by_schema(&self, schema_key: &str) -> Vec<QueryRecord> {
        let ids = {
            self.by_schema
                .read()
                .await
                .get(schema_key)
                .cloned()
                .unwrap_or_default()
        };
        self.collect(ids).await
    }

    pub async fn by_table(&self, table_key: &str) -> Vec<QueryRecord> {
        let ids = {
            self.by_table
                .read()
                .await
                .get(table_key)
                .cloned()
                .unwrap_or_default()
        };
        self.collect(ids).await
    }

    async fn collect(&self, ids: BTreeSet<String>) -> Vec<QueryRecord> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(&id).await {
                out.push(record);
            }
        }
        out
    }

    pub async fn summary(&self) -> DatabaseSummary {
        let total_queries = self.count().await;
        let (catalogs, catalog_query_counts) = {
            let by_catalog = self.by_catalog.read().await;
            (
                by_catalog.keys().cloned().collect(),
                by_catalog
                    .iter()
                    .map(|(catalog, ids)| (catalog.clone(), ids.len()))
                    .collect(),
            )
        };
        let schemas = self.by_schema.read().await.keys().cloned().collect();
        let tables = self.by_table.read().await.keys().cloned().collect();

        DatabaseSummary {
            catalogs,
            schemas,
            tables,
            total_queries,
            catalog_query_counts,
        }
    }
}

impl Default for QueryStore {
    fn default() -> Self {
        Self::new()
    }
}
