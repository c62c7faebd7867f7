//! Entity model and change tracking.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::registry::IndexDefinition;

/// One audited difference between two versions of an entity: the field name
/// and the value it held before the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Name of the changed field.
    pub name: String,
    /// Value of the field before the change.
    pub previous: String,
}

impl FieldChange {
    /// Creates a new field change.
    #[must_use]
    pub fn new(name: impl Into<String>, previous: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            previous: previous.into(),
        }
    }
}

/// Capability of entities that carry an optimistic-concurrency version.
pub trait Versioned {
    /// Number of successful saves and updates applied to the stored document.
    fn version(&self) -> i64;

    /// Overwrites the version stamp.
    fn set_version(&mut self, version: i64);
}

/// A document type managed by a `Repository`.
///
/// Implementors decide which fields are audited: `changes_since` compares
/// only those and must return an empty vector when none differ. Versioning
/// is opt-in through `versioned` / `versioned_mut`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Type name used as collection name and as prefix for counter and
    /// history keys.
    const TYPE_NAME: &'static str;

    /// Secondary indexes the store should maintain for this type.
    const INDEXES: &'static [IndexDefinition] = &[];

    /// Store-assigned identifier, empty before the first save.
    fn id(&self) -> &str;

    /// Assigns the store-generated identifier.
    fn set_id(&mut self, id: String);

    /// Audited fields of `self` that differ from `previous`, paired with the
    /// value held by `previous`.
    fn changes_since(&self, previous: &Self) -> Vec<FieldChange>;

    /// Version view for types that opt in to version checking.
    fn versioned(&self) -> Option<&dyn Versioned> {
        None
    }

    /// Mutable version view for types that opt in to version checking.
    fn versioned_mut(&mut self) -> Option<&mut dyn Versioned> {
        None
    }

    /// Current version, if the type is versioned.
    fn current_version(&self) -> Option<i64> {
        self.versioned().map(|v| v.version())
    }
}

/// Pushes a change for `name` when `current != previous`.
///
/// Small helper for `Entity::changes_since` implementations.
pub fn track<V>(changes: &mut Vec<FieldChange>, name: &str, current: &V, previous: &V)
where
    V: PartialEq + ToString + ?Sized,
{
    if current != previous {
        changes.push(FieldChange::new(name, previous.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        #[serde(default)]
        id: String,
        title: String,
        body: String,
    }

    impl Entity for Note {
        const TYPE_NAME: &'static str = "Note";

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn changes_since(&self, previous: &Self) -> Vec<FieldChange> {
            let mut changes = Vec::new();
            track(&mut changes, "Title", self.title.as_str(), previous.title.as_str());
            changes
        }
    }

    fn note(title: &str, body: &str) -> Note {
        Note {
            id: String::new(),
            title: title.to_owned(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_changes_since_reports_previous_value() {
        let changes = note("new", "b").changes_since(&note("old", "b"));
        assert_eq!(changes, vec![FieldChange::new("Title", "old")]);
    }

    #[test]
    fn test_changes_since_ignores_untracked_fields() {
        assert!(note("t", "new body").changes_since(&note("t", "old body")).is_empty());
    }

    #[test]
    fn test_unversioned_entity_has_no_version() {
        let mut n = note("t", "b");
        assert!(n.current_version().is_none());
        assert!(n.versioned_mut().is_none());
    }
}
