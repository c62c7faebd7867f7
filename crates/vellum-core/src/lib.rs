//! Vellum Core: generic repository over versioned documents.
//!
//! This crate defines the entity model, the outcome envelope, the store
//! traits a backend must implement, and the `Repository<T>` that ties them
//! together with optimistic version checks, field-level audit history and a
//! per-type counter cache. It contains no storage backend of its own.

pub mod audit;
pub mod clock;
pub mod config;
pub mod context;
pub mod counter;
pub mod entity;
pub mod error;
pub mod history;
pub mod outcome;
pub mod registry;
pub mod repository;
pub mod store;
