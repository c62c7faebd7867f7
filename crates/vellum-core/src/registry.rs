//! Static registry of entity types and their secondary indexes.
//!
//! Backends read the registry at startup to create collections and
//! indexes. Types are listed explicitly; nothing is discovered at runtime.

use crate::entity::Entity;

/// How a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Exact-match index.
    Tag {
        /// Whether matching distinguishes letter case.
        case_sensitive: bool,
    },
    /// Full-text index.
    Text,
}

/// A secondary index over one top-level JSON field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDefinition {
    /// JSON field name as serialized.
    pub field: &'static str,
    /// Index kind.
    pub kind: IndexKind,
}

impl IndexDefinition {
    /// Exact-match index.
    #[must_use]
    pub const fn tag(field: &'static str, case_sensitive: bool) -> Self {
        Self {
            field,
            kind: IndexKind::Tag { case_sensitive },
        }
    }

    /// Full-text index.
    #[must_use]
    pub const fn text(field: &'static str) -> Self {
        Self {
            field,
            kind: IndexKind::Text,
        }
    }
}

/// Schema of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// `Entity::TYPE_NAME`.
    pub type_name: &'static str,
    /// `Entity::INDEXES`.
    pub indexes: &'static [IndexDefinition],
}

impl EntityDescriptor {
    /// Descriptor of `T`.
    #[must_use]
    pub fn of<T: Entity>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            indexes: T::INDEXES,
        }
    }
}

/// Ordered list of registered entity types.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    descriptors: Vec<EntityDescriptor>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T`. Registering the same type name twice keeps the first entry.
    #[must_use]
    pub fn register<T: Entity>(mut self) -> Self {
        if self.get(T::TYPE_NAME).is_none() {
            self.descriptors.push(EntityDescriptor::of::<T>());
        }
        self
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&EntityDescriptor> {
        self.descriptors.iter().find(|d| d.type_name == type_name)
    }

    /// Registered descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.iter()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
