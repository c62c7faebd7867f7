//! Vellum maintenance: schema and counter upkeep for a Postgres-backed
//! deployment.

pub mod config;
pub mod error;
pub mod maintenance;
