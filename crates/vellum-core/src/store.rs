//! Store abstractions consumed by the repository.
//!
//! A backend provides three capabilities: a JSON document collection per
//! entity type, named atomic counters, and append-only history streams.

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::FieldChange;
use crate::error::StoreError;
use crate::history::{StreamEntry, StreamId, Trim};

/// A stored document as returned by a `DocumentStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned identifier.
    pub id: String,
    /// Version column, for versioned entity types.
    pub version: Option<i64>,
    /// JSON body.
    pub body: Value,
}

/// Body and version of a document being written.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    /// JSON body.
    pub body: Value,
    /// Version to store alongside the body.
    pub version: Option<i64>,
}

/// JSON document collections addressable by identifier.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its generated identifier.
    async fn insert(&self, collection: &str, document: DocumentWrite) -> Result<String, StoreError>;

    /// Fetches a document by identifier.
    async fn fetch_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Replaces a document.
    ///
    /// When `expected_version` is `Some`, the write is applied only if the
    /// stored version still equals it. A document stored without a version
    /// accepts any expectation, and the write stamps it. Returns `false` if
    /// nothing was written (missing document or version mismatch).
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: DocumentWrite,
        expected_version: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// Deletes a document. Returns `false` if it did not exist.
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All documents of a collection, in insertion order.
    async fn query_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// At most `take` documents after skipping `skip`, in insertion order.
    async fn query_page(
        &self,
        collection: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Exact number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<i64, StoreError>;
}

/// Named atomic integer counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Adds one and returns the new value. A missing counter starts at 0.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Subtracts one and returns the new value. A missing counter starts at 0.
    async fn decrement(&self, key: &str) -> Result<i64, StoreError>;

    /// Reads a counter. A missing counter reads as 0.
    async fn read(&self, key: &str) -> Result<i64, StoreError>;

    /// Overwrites a counter.
    async fn reset(&self, key: &str, value: i64) -> Result<(), StoreError>;
}

/// Append-only, length-bounded streams keyed by name.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends an entry and trims the stream per `trim`. Returns the id
    /// assigned to the new entry; ids within a stream strictly increase.
    async fn append(
        &self,
        key: &str,
        fields: &[FieldChange],
        trim: Trim,
    ) -> Result<StreamId, StoreError>;

    /// All entries of a stream, oldest first. A missing stream is empty.
    async fn range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError>;
}
