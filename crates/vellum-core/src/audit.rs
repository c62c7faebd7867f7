//! Per-entity append-only audit log.

use std::sync::Arc;

use crate::entity::FieldChange;
use crate::error::RepositoryError;
use crate::history::{HistoryRecord, StreamId, Trim};
use crate::store::HistoryStore;

/// Name of the synthetic field recording who made a change.
pub const ACTOR_FIELD: &str = "user";

/// History stream key for one entity.
#[must_use]
pub fn history_key(type_name: &str, id: &str) -> String {
    format!("{type_name}:{id}:history")
}

/// Bounded audit log of field changes, one stream per entity.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn HistoryStore>,
    max_len: usize,
}

impl AuditLog {
    /// Creates an audit log keeping roughly the `max_len` most recent
    /// records per entity.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, max_len: usize) -> Self {
        Self { store, max_len }
    }

    /// Appends one record holding `changes` followed by the actor entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Infrastructure` if the history store fails.
    pub async fn append(
        &self,
        type_name: &str,
        id: &str,
        mut changes: Vec<FieldChange>,
        actor: &str,
    ) -> Result<StreamId, RepositoryError> {
        changes.push(FieldChange::new(ACTOR_FIELD, actor));
        let stream_id = self
            .store
            .append(
                &history_key(type_name, id),
                &changes,
                Trim::approximate(self.max_len),
            )
            .await?;
        Ok(stream_id)
    }

    /// Every retained record of one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Infrastructure` if the history store fails
    /// and `RepositoryError::CorruptHistory` if an entry's stream id does not
    /// encode a valid timestamp.
    pub async fn read_range(
        &self,
        type_name: &str,
        id: &str,
    ) -> Result<Vec<HistoryRecord>, RepositoryError> {
        self.store
            .range(&history_key(type_name, id))
            .await?
            .into_iter()
            .map(HistoryRecord::try_from)
            .collect()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("max_len", &self.max_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::StoreError;
    use crate::history::StreamEntry;

    /// History store that records every append.
    #[derive(Default)]
    struct Recording {
        appends: Mutex<Vec<(String, Trim)>>,
        entries: Mutex<Vec<StreamEntry>>,
    }

    #[async_trait]
    impl HistoryStore for Recording {
        async fn append(
            &self,
            key: &str,
            fields: &[FieldChange],
            trim: Trim,
        ) -> Result<StreamId, StoreError> {
            let mut entries = self.entries.lock().unwrap();
            let id = StreamId::new(1_768_471_200_000, u64::try_from(entries.len()).unwrap());
            entries.push(StreamEntry {
                id,
                fields: fields.to_vec(),
            });
            self.appends.lock().unwrap().push((key.to_owned(), trim));
            Ok(id)
        }

        async fn range(&self, _key: &str) -> Result<Vec<StreamEntry>, StoreError> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    #[test]
    fn test_history_key_is_scoped_per_entity() {
        assert_eq!(history_key("Rose", "01J"), "Rose:01J:history");
    }

    #[tokio::test]
    async fn test_append_adds_actor_entry_and_trims_approximately() {
        // Arrange
        let store = Arc::new(Recording::default());
        let audit = AuditLog::new(store.clone(), 10);

        // Act
        let stream_id = audit
            .append("Rose", "01J", vec![FieldChange::new("Name", "Rose1")], "root")
            .await
            .unwrap();

        // Assert
        assert_eq!(stream_id, StreamId::new(1_768_471_200_000, 0));
        assert_eq!(
            store.appends.lock().unwrap().clone(),
            vec![("Rose:01J:history".to_owned(), Trim::approximate(10))]
        );
        let records = audit.read_range("Rose", "01J").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream_id, "1768471200000-0");
        assert_eq!(
            records[0].changes,
            vec![FieldChange::new("Name", "Rose1"), FieldChange::new("user", "root")]
        );
    }

    #[tokio::test]
    async fn test_read_range_rejects_unrepresentable_timestamp() {
        let store = Arc::new(Recording::default());
        store.entries.lock().unwrap().push(StreamEntry {
            id: StreamId::new(u64::MAX, 0),
            fields: Vec::new(),
        });
        let audit = AuditLog::new(store, 10);

        let result = audit.read_range("Rose", "01J").await;

        assert!(matches!(result, Err(RepositoryError::CorruptHistory(_))));
    }
}
