//! Per-type live document counter.

use std::sync::Arc;

use tracing::info;

use crate::error::StoreError;
use crate::store::{CounterStore, DocumentStore};

/// Counter key for an entity type.
#[must_use]
pub fn counter_key(type_name: &str) -> String {
    format!("{type_name}:Counter")
}

/// Denormalized count of live documents per entity type.
///
/// Maintained by increment/decrement alongside inserts and deletes. The
/// counter write is not atomic with the document write, so the value can
/// drift after a partial failure; `reconcile` recomputes it from the store.
#[derive(Clone)]
pub struct CounterCache {
    store: Arc<dyn CounterStore>,
}

impl CounterCache {
    /// Creates a counter cache over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Records one more document of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the counter store fails.
    pub async fn increment(&self, type_name: &str) -> Result<i64, StoreError> {
        self.store.increment(&counter_key(type_name)).await
    }

    /// Records one less document of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the counter store fails.
    pub async fn decrement(&self, type_name: &str) -> Result<i64, StoreError> {
        self.store.decrement(&counter_key(type_name)).await
    }

    /// Current cached count for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the counter store fails.
    pub async fn read(&self, type_name: &str) -> Result<i64, StoreError> {
        self.store.read(&counter_key(type_name)).await
    }

    /// Recounts the documents of `type_name` and resets the counter to the
    /// true value. Returns the recomputed count.
    ///
    /// Concurrent inserts or deletes during the recount may still leave the
    /// counter off by their number.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either store fails.
    pub async fn reconcile(
        &self,
        type_name: &str,
        documents: &dyn DocumentStore,
    ) -> Result<i64, StoreError> {
        let cached = self.read(type_name).await?;
        let actual = documents.count(type_name).await?;
        self.store.reset(&counter_key(type_name), actual).await?;
        if cached != actual {
            info!(entity_type = type_name, cached, actual, "counter drift corrected");
        }
        Ok(actual)
    }
}

impl std::fmt::Debug for CounterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterCache").finish_non_exhaustive()
    }
}
