//! Generic repository over versioned documents.
//!
//! Every operation returns an `Outcome`: expected conditions such as a
//! missing document or a stale version are statuses, and only store or
//! serialization failures surface as `RepositoryError`.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::audit::AuditLog;
use crate::config::RepositoryConfig;
use crate::context::CallerContext;
use crate::counter::CounterCache;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::history::History;
use crate::outcome::{Outcome, Pagination, Status};
use crate::store::{CounterStore, Document, DocumentStore, DocumentWrite, HistoryStore};

const SAVE_WITH_ID: &str =
    "Invalid request, this method accepts only insert. Do not set id for this method.";
const TOO_MANY_RECORDS: &str = "Too many records. Use pagination method.";
const ENTITY_MISSING: &str = "Entity does not exist.";
const VERSION_MISMATCH: &str = "Entity version does not match. Fetch entity again.";
const CONCURRENT_UPDATE: &str = "Entity was modified concurrently. Fetch entity again.";

/// A page request after clamping.
///
/// `offset` is a zero-based **page number**, not a row offset: the rows
/// skipped are `offset * limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, at least 0.
    pub offset: i64,
    /// Page size, between 0 and the configured maximum.
    pub limit: i64,
}

impl Page {
    /// Clamps `limit` into `0..=max_limit` and `offset` to at least 0.
    #[must_use]
    pub fn clamped(offset: i64, limit: i64, max_limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(0, max_limit),
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn skip(&self) -> usize {
        usize::try_from(self.offset.saturating_mul(self.limit)).unwrap_or(usize::MAX)
    }

    /// Number of rows to take.
    #[must_use]
    pub fn take(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(0)
    }

    fn pagination(&self, total_count: i64) -> Pagination {
        Pagination::new(self.offset, self.limit, total_count)
    }
}

/// CRUD access to documents of type `T` with version checks, audit history
/// and a counter cache.
///
/// The repository holds no mutable state; clones share the same stores.
pub struct Repository<T> {
    documents: Arc<dyn DocumentStore>,
    counters: CounterCache,
    audit: AuditLog,
    config: RepositoryConfig,
    entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository over separate document, counter and history
    /// stores.
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        counters: Arc<dyn CounterStore>,
        history: Arc<dyn HistoryStore>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            documents,
            counters: CounterCache::new(counters),
            audit: AuditLog::new(history, config.history_max_len),
            config,
            entity: PhantomData,
        }
    }

    /// Creates a repository over a backend that provides all three stores.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, config: RepositoryConfig) -> Self
    where
        S: DocumentStore + CounterStore + HistoryStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Inserts a new entity.
    ///
    /// The entity must not have an id yet; updates go through `update`.
    /// Versioned entities are stored with version 1.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the entity cannot be
    /// serialized.
    #[instrument(skip(self, ctx, entity), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn save(
        &self,
        ctx: &CallerContext,
        mut entity: T,
    ) -> Result<Outcome<T>, RepositoryError> {
        if !entity.id().is_empty() {
            warn!(id = entity.id(), "save refused: id already set");
            return Ok(outcome(ctx, Status::InvalidOperation)
                .with_data(entity)
                .with_description(SAVE_WITH_ID));
        }

        if let Some(versioned) = entity.versioned_mut() {
            versioned.set_version(1);
        }

        let id = self.documents.insert(T::TYPE_NAME, encode(&entity)?).await?;
        entity.set_id(id);
        self.counters.increment(T::TYPE_NAME).await?;

        debug!(id = entity.id(), "entity saved");
        Ok(outcome(ctx, Status::Success).with_data(entity))
    }

    /// Fetches an entity by id. A missing entity is `EntityIsNull`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document cannot be
    /// decoded.
    #[instrument(skip(self, ctx), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn find_by_id(
        &self,
        ctx: &CallerContext,
        id: &str,
    ) -> Result<Outcome<T>, RepositoryError> {
        Ok(match self.fetch(id).await? {
            Some(entity) => outcome(ctx, Status::Success).with_data(entity),
            None => outcome(ctx, Status::EntityIsNull),
        })
    }

    /// All entities matching `predicate`, filtered in memory.
    ///
    /// Pagination reports the match count; the result is not sliced.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document cannot be
    /// decoded.
    #[instrument(skip(self, ctx, predicate), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn get_where<P>(
        &self,
        ctx: &CallerContext,
        predicate: P,
    ) -> Result<Outcome<Vec<T>>, RepositoryError>
    where
        P: Fn(&T) -> bool,
    {
        let matches: Vec<T> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|e| predicate(e))
            .collect();
        let total = count_of(&matches);
        Ok(collection(ctx, matches).with_pagination(Pagination::new(0, 0, total)))
    }

    /// Every entity of the type.
    ///
    /// Refused with `TooManyRecords`, without touching the collection, when
    /// the counter cache reports more than the configured maximum.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document cannot be
    /// decoded.
    #[instrument(skip(self, ctx), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn get_all(&self, ctx: &CallerContext) -> Result<Outcome<Vec<T>>, RepositoryError> {
        let count = self.counters.read(T::TYPE_NAME).await?;
        if count > self.max_entity_count() {
            warn!(count, "unpaginated read refused");
            return Ok(outcome(ctx, Status::TooManyRecords)
                .with_pagination(Pagination::new(0, 0, count))
                .with_description(TOO_MANY_RECORDS));
        }

        let entities = self.fetch_all().await?;
        Ok(collection(ctx, entities))
    }

    /// One page of entities, in insertion order.
    ///
    /// `offset` is a zero-based page number: the store skips
    /// `offset * limit` documents. `limit` is clamped to the configured
    /// maximum and `offset` to at least 0. The total count comes from the
    /// counter cache. An empty page is `CollectionIsEmpty`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document cannot be
    /// decoded.
    #[instrument(skip(self, ctx), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn get_page(
        &self,
        ctx: &CallerContext,
        offset: i64,
        limit: i64,
    ) -> Result<Outcome<Vec<T>>, RepositoryError> {
        let page = Page::clamped(offset, limit, self.max_entity_count());
        let entities = self
            .documents
            .query_page(T::TYPE_NAME, page.skip(), page.take())
            .await?
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<T>, _>>()?;
        let total = self.counters.read(T::TYPE_NAME).await?;
        Ok(collection(ctx, entities).with_pagination(page.pagination(total)))
    }

    /// One page of the entities matching `predicate`.
    ///
    /// Same page arithmetic as `get_page`, applied after filtering; the
    /// total count is the number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document cannot be
    /// decoded.
    #[instrument(skip(self, ctx, predicate), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn get_page_where<P>(
        &self,
        ctx: &CallerContext,
        predicate: P,
        offset: i64,
        limit: i64,
    ) -> Result<Outcome<Vec<T>>, RepositoryError>
    where
        P: Fn(&T) -> bool,
    {
        let page = Page::clamped(offset, limit, self.max_entity_count());
        let matches: Vec<T> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|e| predicate(e))
            .collect();
        let total = count_of(&matches);
        let entities = matches.into_iter().skip(page.skip()).take(page.take()).collect();
        Ok(collection(ctx, entities).with_pagination(page.pagination(total)))
    }

    /// Replaces a stored entity.
    ///
    /// For versioned types the incoming version must equal the stored one;
    /// on success it is incremented. Audited field changes are appended to
    /// the entity's history before the write. The write itself is
    /// conditional on the version read, so a concurrent update between read
    /// and write yields `InvalidVersion`. History is not rolled back when the
    /// write is lost or fails.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a store fails or the entity cannot be
    /// serialized.
    #[instrument(skip(self, ctx, entity), fields(entity_type = T::TYPE_NAME, id = entity.id(), trace_id = ?ctx.trace_id))]
    pub async fn update(
        &self,
        ctx: &CallerContext,
        mut entity: T,
    ) -> Result<Outcome<T>, RepositoryError> {
        let id = entity.id().to_owned();
        let Some(existing) = self.fetch(&id).await? else {
            return Ok(outcome(ctx, Status::NotFound)
                .with_data(entity)
                .with_description(ENTITY_MISSING));
        };

        let expected_version = match (entity.current_version(), existing.current_version()) {
            (Some(incoming), Some(stored)) => {
                if incoming != stored {
                    warn!(incoming, stored, "update refused: stale version");
                    return Ok(outcome(ctx, Status::InvalidVersion)
                        .with_data(entity)
                        .with_description(VERSION_MISMATCH));
                }
                set_version(&mut entity, stored + 1);
                Some(stored)
            }
            _ => None,
        };

        let changes = entity.changes_since(&existing);
        if !changes.is_empty() {
            self.audit
                .append(T::TYPE_NAME, &id, changes, ctx.actor_or_anonymous())
                .await?;
        }

        let written = self
            .documents
            .update_by_id(T::TYPE_NAME, &id, encode(&entity)?, expected_version)
            .await?;
        if !written {
            return Ok(match expected_version {
                Some(stored) => {
                    warn!(stored, "update lost to a concurrent write");
                    set_version(&mut entity, stored);
                    outcome(ctx, Status::InvalidVersion)
                        .with_data(entity)
                        .with_description(CONCURRENT_UPDATE)
                }
                None => outcome(ctx, Status::NotFound)
                    .with_data(entity)
                    .with_description(ENTITY_MISSING),
            });
        }

        debug!("entity updated");
        Ok(outcome(ctx, Status::Success).with_data(entity))
    }

    /// Deletes an entity, returning its last stored state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a store fails or the document cannot be
    /// decoded.
    #[instrument(skip(self, ctx), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn delete(
        &self,
        ctx: &CallerContext,
        id: &str,
    ) -> Result<Outcome<T>, RepositoryError> {
        let Some(entity) = self.fetch(id).await? else {
            return Ok(outcome(ctx, Status::NotFound).with_description(ENTITY_MISSING));
        };

        if !self.documents.delete_by_id(T::TYPE_NAME, id).await? {
            return Ok(outcome(ctx, Status::NotFound).with_description(ENTITY_MISSING));
        }
        self.counters.decrement(T::TYPE_NAME).await?;

        debug!("entity deleted");
        Ok(outcome(ctx, Status::Success).with_data(entity))
    }

    /// Audit history of one entity, oldest record first.
    ///
    /// Always `Success`; an entity without history yields no records. The
    /// log is observational: a record may exist for a write that was later
    /// lost or failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the history store fails or holds an
    /// unreadable entry.
    #[instrument(skip(self, ctx), fields(entity_type = T::TYPE_NAME, trace_id = ?ctx.trace_id))]
    pub async fn get_history(
        &self,
        ctx: &CallerContext,
        id: &str,
    ) -> Result<Outcome<History>, RepositoryError> {
        let records = self.audit.read_range(T::TYPE_NAME, id).await?;
        Ok(outcome(ctx, Status::Success).with_data(History {
            id: id.to_owned(),
            entity_name: T::TYPE_NAME.to_owned(),
            records,
        }))
    }

    /// Recounts the stored documents of this type and resets the counter
    /// cache to that value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Infrastructure` if a store fails.
    #[instrument(skip(self), fields(entity_type = T::TYPE_NAME))]
    pub async fn reconcile(&self) -> Result<i64, RepositoryError> {
        Ok(self
            .counters
            .reconcile(T::TYPE_NAME, self.documents.as_ref())
            .await?)
    }

    async fn fetch(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        if id.is_empty() {
            return Ok(None);
        }
        self.documents
            .fetch_by_id(T::TYPE_NAME, id)
            .await?
            .map(decode)
            .transpose()
    }

    async fn fetch_all(&self) -> Result<Vec<T>, RepositoryError> {
        self.documents
            .query_all(T::TYPE_NAME)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    fn max_entity_count(&self) -> i64 {
        i64::try_from(self.config.max_entity_count).unwrap_or(i64::MAX)
    }
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            counters: self.counters.clone(),
            audit: self.audit.clone(),
            config: self.config,
            entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<T>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn outcome<D>(ctx: &CallerContext, status: Status) -> Outcome<D> {
    Outcome::new(status).with_trace_id(ctx.trace_id)
}

fn collection<T>(ctx: &CallerContext, entities: Vec<T>) -> Outcome<Vec<T>> {
    let status = if entities.is_empty() {
        Status::CollectionIsEmpty
    } else {
        Status::Success
    };
    outcome(ctx, status).with_data(entities)
}

fn count_of<T>(items: &[T]) -> i64 {
    i64::try_from(items.len()).unwrap_or(i64::MAX)
}

fn set_version<T: Entity>(entity: &mut T, version: i64) {
    if let Some(versioned) = entity.versioned_mut() {
        versioned.set_version(version);
    }
}

fn encode<T: Entity>(entity: &T) -> Result<DocumentWrite, RepositoryError> {
    Ok(DocumentWrite {
        body: serde_json::to_value(entity)?,
        version: entity.current_version(),
    })
}

fn decode<T: Entity>(document: Document) -> Result<T, RepositoryError> {
    let mut entity: T = serde_json::from_value(document.body)?;
    entity.set_id(document.id);
    if let Some(version) = document.version {
        set_version(&mut entity, version);
    }
    Ok(entity)
}
