//! Repository behaviour for a type without versioning or audited fields.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vellum_core::config::RepositoryConfig;
use vellum_core::context::CallerContext;
use vellum_core::entity::{Entity, FieldChange};
use vellum_core::error::StoreError;
use vellum_core::outcome::Status;
use vellum_core::repository::Repository;
use vellum_core::store::{CounterStore, Document, DocumentStore, DocumentWrite};
use vellum_test_support::InMemoryStore;

/// A label with nothing audited and no version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Tag {
    #[serde(default)]
    id: String,
    label: String,
}

impl Tag {
    fn new(label: &str) -> Self {
        Self {
            id: String::new(),
            label: label.to_owned(),
        }
    }
}

impl Entity for Tag {
    const TYPE_NAME: &'static str = "Tag";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn changes_since(&self, _previous: &Self) -> Vec<FieldChange> {
        Vec::new()
    }
}

fn repository(store: &Arc<InMemoryStore>) -> Repository<Tag> {
    Repository::from_store(Arc::clone(store), RepositoryConfig::default())
}

fn ctx() -> CallerContext {
    CallerContext::new("root", Uuid::new_v4())
}

async fn saved(repo: &Repository<Tag>, label: &str) -> Tag {
    repo.save(&ctx(), Tag::new(label)).await.unwrap().data.unwrap()
}

/// Document store where a competing writer deletes the document between the
/// repository's read and its write or delete.
struct ConcurrentDelete {
    inner: Arc<InMemoryStore>,
}

#[async_trait]
impl DocumentStore for ConcurrentDelete {
    async fn insert(&self, collection: &str, document: DocumentWrite) -> Result<String, StoreError> {
        self.inner.insert(collection, document).await
    }

    async fn fetch_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.fetch_by_id(collection, id).await
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: DocumentWrite,
        expected_version: Option<i64>,
    ) -> Result<bool, StoreError> {
        self.inner.delete_by_id(collection, id).await?;
        self.inner
            .update_by_id(collection, id, document, expected_version)
            .await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_by_id(collection, id).await?;
        self.inner.delete_by_id(collection, id).await
    }

    async fn query_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.query_all(collection).await
    }

    async fn query_page(
        &self,
        collection: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query_page(collection, skip, take).await
    }

    async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        self.inner.count(collection).await
    }
}

fn racing(store: &Arc<InMemoryStore>) -> Repository<Tag> {
    Repository::new(
        Arc::new(ConcurrentDelete {
            inner: Arc::clone(store),
        }),
        store.clone(),
        store.clone(),
        RepositoryConfig::default(),
    )
}

#[tokio::test]
async fn test_save_stores_document_without_version() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(&store);

    // Act
    let outcome = repo.save(&ctx(), Tag::new("a")).await.unwrap();

    // Assert
    assert_eq!(outcome.status, Status::Success);
    let tag = outcome.data.unwrap();
    assert!(!tag.id.is_empty());
    let stored = store.fetch_by_id("Tag", &tag.id).await.unwrap().unwrap();
    assert_eq!(stored.version, None);
    assert_eq!(store.read("Tag:Counter").await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_replaces_document_without_version_or_history() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(&store);
    let mut tag = saved(&repo, "a").await;
    tag.label = "b".to_owned();

    // Act
    let outcome = repo.update(&ctx(), tag.clone()).await.unwrap();

    // Assert
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.data, Some(tag.clone()));
    let stored = store.fetch_by_id("Tag", &tag.id).await.unwrap().unwrap();
    assert_eq!(stored.version, None);
    assert_eq!(stored.body["label"], "b");
    assert_eq!(store.stream_len(&format!("Tag:{}:history", tag.id)), 0);
    let history = repo.get_history(&ctx(), &tag.id).await.unwrap();
    assert!(history.data.unwrap().records.is_empty());
}

#[tokio::test]
async fn test_update_after_concurrent_delete_is_not_found() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let mut tag = saved(&repository(&store), "a").await;
    tag.label = "b".to_owned();

    // Act
    let outcome = racing(&store).update(&ctx(), tag.clone()).await.unwrap();

    // Assert
    assert_eq!(outcome.status, Status::NotFound);
    assert_eq!(outcome.description.as_deref(), Some("Entity does not exist."));
    assert_eq!(outcome.data, Some(tag));
    assert_eq!(store.document_count("Tag"), 0);
}

#[tokio::test]
async fn test_delete_removes_document_and_decrements_counter() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(&store);
    let tag = saved(&repo, "a").await;

    // Act
    let outcome = repo.delete(&ctx(), &tag.id).await.unwrap();

    // Assert
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.data, Some(tag));
    assert_eq!(store.document_count("Tag"), 0);
    assert_eq!(store.read("Tag:Counter").await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_losing_to_concurrent_delete_is_not_found_and_keeps_counter() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let tag = saved(&repository(&store), "a").await;

    // Act
    let outcome = racing(&store).delete(&ctx(), &tag.id).await.unwrap();

    // Assert
    assert_eq!(outcome.status, Status::NotFound);
    assert!(outcome.data.is_none());
    assert_eq!(store.read("Tag:Counter").await.unwrap(), 1);
}
