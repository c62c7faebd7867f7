//! Integration tests for a maintenance pass.

use serde_json::json;
use sqlx::PgPool;
use vellum_core::store::{CounterStore, DocumentStore, DocumentWrite};
use vellum_maintenance::maintenance::run;
use vellum_pg::pg_store::PgStore;

#[sqlx::test(migrations = false)]
async fn test_run_on_empty_database_creates_schema(pool: PgPool) {
    // Act
    let report = run(&pool, &vellum_catalog::registry()).await.unwrap();

    // Assert
    assert_eq!(report.indexes, 4);
    assert_eq!(
        report.counts,
        vec![("Rose".to_owned(), 0), ("User".to_owned(), 0)]
    );
}

#[sqlx::test(migrations = false)]
async fn test_run_corrects_counter_drift(pool: PgPool) {
    // Arrange
    run(&pool, &vellum_catalog::registry()).await.unwrap();
    let store = PgStore::new(pool.clone());
    for name in ["Rose1", "Rose2"] {
        store
            .insert(
                "Rose",
                DocumentWrite {
                    body: json!({ "name": name }),
                    version: Some(1),
                },
            )
            .await
            .unwrap();
    }
    store.reset("Rose:Counter", 17).await.unwrap();

    // Act
    let report = run(&pool, &vellum_catalog::registry()).await.unwrap();

    // Assert
    assert_eq!(report.counts[0], ("Rose".to_owned(), 2));
    assert_eq!(store.read("Rose:Counter").await.unwrap(), 2);
}
