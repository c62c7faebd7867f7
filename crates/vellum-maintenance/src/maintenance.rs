//! One maintenance pass over a Vellum database.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use vellum_core::counter::CounterCache;
use vellum_core::registry::EntityRegistry;
use vellum_pg::pg_store::PgStore;
use vellum_pg::schema::{MIGRATOR, bootstrap};

use crate::error::AppError;

/// What a maintenance pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Index statements executed.
    pub indexes: usize,
    /// Live document count per entity type, after reconciliation.
    pub counts: Vec<(String, i64)>,
}

/// Applies pending migrations, ensures the indexes of every registered type
/// and resets each type's counter to its true document count.
///
/// # Errors
///
/// Returns `AppError::Migrate` if a migration fails and
/// `AppError::Repository` if index creation or reconciliation fails.
pub async fn run(pool: &PgPool, registry: &EntityRegistry) -> Result<MaintenanceReport, AppError> {
    MIGRATOR.run(pool).await?;
    info!("migrations applied");

    let indexes = bootstrap(pool, registry).await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let counters = CounterCache::new(store.clone());
    let mut counts = Vec::with_capacity(registry.len());
    for descriptor in registry.iter() {
        let count = counters.reconcile(descriptor.type_name, store.as_ref()).await?;
        info!(entity_type = descriptor.type_name, count, "counter reconciled");
        counts.push((descriptor.type_name.to_owned(), count));
    }

    Ok(MaintenanceReport { indexes, counts })
}
