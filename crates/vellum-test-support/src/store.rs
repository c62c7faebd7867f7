//! In-memory and always-failing implementations of the
//! document, counter and history store traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;
use vellum_core::clock::{Clock, SystemClock};
use vellum_core::entity::FieldChange;
use vellum_core::error::StoreError;
use vellum_core::history::{StreamEntry, StreamId, Trim};
use vellum_core::store::{CounterStore, Document, DocumentStore, DocumentWrite, HistoryStore};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    counters: HashMap<String, i64>,
    streams: HashMap<String, Vec<StreamEntry>>,
    collection_reads: usize,
    fail_updates: bool,
}

/// A store that keeps documents, counters and history streams in memory.
///
/// Documents are kept in insertion order. Stream ids are stamped from the
/// configured clock. Inspection helpers expose what a test needs to assert
/// on without going through the repository.
pub struct InMemoryStore {
    state: Mutex<State>,
    clock: Box<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    /// Creates an empty store stamping history with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty store stamping history with `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock: Box::new(clock),
        }
    }

    /// Number of `query_all` and `query_page` calls served so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn collection_reads(&self) -> usize {
        self.state.lock().unwrap().collection_reads
    }

    /// Number of documents currently stored in `collection`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Number of entries currently retained in stream `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream_len(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Makes every subsequent `update_by_id` fail with an infrastructure
    /// error, or restores normal behaviour.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_updates(&self, fail: bool) {
        self.state.lock().unwrap().fail_updates = fail;
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &str, document: DocumentWrite) -> Result<String, StoreError> {
        let id = Uuid::now_v7().simple().to_string();
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(collection.to_owned())
            .or_default()
            .push(Document {
                id: id.clone(),
                version: document.version,
                body: document.body,
            });
        Ok(id)
    }

    async fn fetch_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: DocumentWrite,
        expected_version: Option<i64>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        let Some(stored) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(false);
        };
        if expected_version.is_some()
            && stored.version.is_some()
            && stored.version != expected_version
        {
            return Ok(false);
        }
        stored.version = document.version;
        stored.body = document.body;
        Ok(true)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(docs) = state.collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }

    async fn query_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.collection_reads += 1;
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn query_page(
        &self,
        collection: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.collection_reads += 1;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.iter().skip(skip).take(take).cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        let len = self.document_count(collection);
        i64::try_from(len).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let value = state.counters.entry(key.to_owned()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let value = state.counters.entry(key.to_owned()).or_insert(0);
        *value -= 1;
        Ok(*value)
    }

    async fn read(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .counters
            .get(key)
            .copied()
            .unwrap_or(0))
    }

    async fn reset(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .counters
            .insert(key.to_owned(), value);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append(
        &self,
        key: &str,
        fields: &[FieldChange],
        trim: Trim,
    ) -> Result<StreamId, StoreError> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().unwrap();
        let stream = state.streams.entry(key.to_owned()).or_default();
        let id = StreamId::next_after(stream.last().map(|e| e.id), now);
        stream.push(StreamEntry {
            id,
            fields: fields.to_vec(),
        });
        let excess = trim.excess(stream.len());
        stream.drain(..excess);
        Ok(id)
    }

    async fn range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .streams
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}

/// A store whose every operation fails with an infrastructure error. Useful
/// for testing error-propagation paths.
#[derive(Debug)]
pub struct FailingStore;

fn refused<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, _collection: &str, _document: DocumentWrite) -> Result<String, StoreError> {
        refused()
    }

    async fn fetch_by_id(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        refused()
    }

    async fn update_by_id(
        &self,
        _collection: &str,
        _id: &str,
        _document: DocumentWrite,
        _expected_version: Option<i64>,
    ) -> Result<bool, StoreError> {
        refused()
    }

    async fn delete_by_id(&self, _collection: &str, _id: &str) -> Result<bool, StoreError> {
        refused()
    }

    async fn query_all(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        refused()
    }

    async fn query_page(
        &self,
        _collection: &str,
        _skip: usize,
        _take: usize,
    ) -> Result<Vec<Document>, StoreError> {
        refused()
    }

    async fn count(&self, _collection: &str) -> Result<i64, StoreError> {
        refused()
    }
}

#[async_trait]
impl CounterStore for FailingStore {
    async fn increment(&self, _key: &str) -> Result<i64, StoreError> {
        refused()
    }

    async fn decrement(&self, _key: &str) -> Result<i64, StoreError> {
        refused()
    }

    async fn read(&self, _key: &str) -> Result<i64, StoreError> {
        refused()
    }

    async fn reset(&self, _key: &str, _value: i64) -> Result<(), StoreError> {
        refused()
    }
}

#[async_trait]
impl HistoryStore for FailingStore {
    async fn append(
        &self,
        _key: &str,
        _fields: &[FieldChange],
        _trim: Trim,
    ) -> Result<StreamId, StoreError> {
        refused()
    }

    async fn range(&self, _key: &str) -> Result<Vec<StreamEntry>, StoreError> {
        refused()
    }
}
