//! User account documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vellum_core::entity::{Entity, FieldChange, Versioned, track};
use vellum_core::registry::IndexDefinition;

/// An account able to call the catalog.
///
/// Password hashing happens before the document reaches the repository;
/// only the hash is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, empty until saved.
    #[serde(default)]
    pub id: String,
    /// Optimistic-concurrency version.
    #[serde(default)]
    pub version: i64,
    /// Login name, matched case-insensitively.
    pub name: String,
    /// Hash of the password.
    pub password_hash: String,
    /// Authorization role (`reader`, `moderator`, `root`).
    pub role: String,
    /// Account creation time.
    pub created_date: DateTime<Utc>,
    /// Last successful login.
    pub last_login_date: Option<DateTime<Utc>>,
}

impl User {
    /// Creates an unsaved user.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        password_hash: impl Into<String>,
        role: impl Into<String>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            version: 0,
            name: name.into(),
            password_hash: password_hash.into(),
            role: role.into(),
            created_date,
            last_login_date: None,
        }
    }
}

impl Versioned for User {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Entity for User {
    const TYPE_NAME: &'static str = "User";
    const INDEXES: &'static [IndexDefinition] = &[
        IndexDefinition::tag("name", false),
        IndexDefinition::tag("password_hash", true),
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    // Only role changes are audited; credentials never enter history.
    fn changes_since(&self, previous: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        track(&mut changes, "Role", self.role.as_str(), previous.role.as_str());
        changes
    }

    fn versioned(&self) -> Option<&dyn Versioned> {
        Some(self)
    }

    fn versioned_mut(&mut self) -> Option<&mut dyn Versioned> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user() -> User {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        User::new("alice", "hash-1", "reader", created)
    }

    #[test]
    fn test_password_change_is_not_audited() {
        let before = user();
        let mut after = before.clone();
        after.password_hash = "hash-2".to_owned();
        after.last_login_date = Some(Utc::now());

        assert!(after.changes_since(&before).is_empty());
    }

    #[test]
    fn test_role_change_is_audited() {
        let before = user();
        let mut after = before.clone();
        after.role = "root".to_owned();

        assert_eq!(after.changes_since(&before), vec![FieldChange::new("Role", "reader")]);
    }
}
