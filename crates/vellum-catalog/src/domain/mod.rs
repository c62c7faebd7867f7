//! Catalog entity types.

pub mod rose;
pub mod user;
