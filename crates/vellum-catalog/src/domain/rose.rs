//! Rose documents.

use serde::{Deserialize, Serialize};
use vellum_core::entity::{Entity, FieldChange, Versioned, track};
use vellum_core::registry::IndexDefinition;

/// A rose variety in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rose {
    /// Store-assigned identifier, empty until saved.
    #[serde(default)]
    pub id: String,
    /// Optimistic-concurrency version.
    #[serde(default)]
    pub version: i64,
    /// Variety name, matched case-insensitively.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Rose {
    /// Creates an unsaved rose.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

impl Versioned for Rose {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Entity for Rose {
    const TYPE_NAME: &'static str = "Rose";
    const INDEXES: &'static [IndexDefinition] = &[
        IndexDefinition::tag("name", false),
        IndexDefinition::text("description"),
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    // Images are not audited.
    fn changes_since(&self, previous: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        track(&mut changes, "Name", self.name.as_str(), previous.name.as_str());
        track(
            &mut changes,
            "Description",
            self.description.as_str(),
            previous.description.as_str(),
        );
        changes
    }

    fn versioned(&self) -> Option<&dyn Versioned> {
        Some(self)
    }

    fn versioned_mut(&mut self) -> Option<&mut dyn Versioned> {
        Some(self)
    }
}
