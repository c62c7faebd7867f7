//! Vellum Catalog: the concrete document types served by the repository.
//!
//! Each type declares which fields are audited and which are indexed;
//! `registry()` lists every type so backends can bootstrap their schema.

pub mod domain;

use vellum_core::registry::EntityRegistry;

use crate::domain::rose::Rose;
use crate::domain::user::User;

/// Every catalog entity type, in bootstrap order.
#[must_use]
pub fn registry() -> EntityRegistry {
    EntityRegistry::new().register::<Rose>().register::<User>()
}
