//! PostgreSQL backend for Vellum.
//!
//! [`pg_store::PgStore`] implements the document, counter and history store
//! traits over a single `PgPool`. [`schema`] holds the embedded migrations and
//! creates secondary indexes for the registered entity types.

pub mod pg_store;
pub mod schema;
