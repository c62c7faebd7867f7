//! Document store schema: embedded migrations and per-type secondary indexes.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use vellum_core::error::StoreError;
use vellum_core::registry::{EntityDescriptor, EntityRegistry, IndexKind};

/// Migrations creating the `documents`, `counters` and `history_entries`
/// tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Text search configuration used by full-text indexes.
pub const TEXT_SEARCH_CONFIG: &str = "simple";

fn identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_owned()))
    }
}

/// `CREATE INDEX` statements for every index declared by one entity type.
///
/// Each index is a partial expression index over the type's rows of the
/// `documents` table. Type and field names are spliced into the DDL, so
/// both must be plain identifiers.
///
/// # Errors
///
/// Returns `StoreError::InvalidIdentifier` if the type name or a field name
/// is not a plain identifier.
pub fn index_statements(descriptor: &EntityDescriptor) -> Result<Vec<String>, StoreError> {
    let type_name = identifier(descriptor.type_name)?;
    let prefix = type_name.to_lowercase();

    descriptor
        .indexes
        .iter()
        .map(|index| {
            let field = identifier(index.field)?;
            let (suffix, using, expression) = match index.kind {
                IndexKind::Tag {
                    case_sensitive: true,
                } => ("tag", "", format!("((body ->> '{field}'))")),
                IndexKind::Tag {
                    case_sensitive: false,
                } => ("tag", "", format!("(lower(body ->> '{field}'))")),
                IndexKind::Text => (
                    "text",
                    "USING GIN ",
                    format!(
                        "(to_tsvector('{TEXT_SEARCH_CONFIG}', coalesce(body ->> '{field}', '')))"
                    ),
                ),
            };
            Ok(format!(
                "CREATE INDEX IF NOT EXISTS documents_{prefix}_{field}_{suffix} \
                 ON documents {using}{expression} WHERE collection = '{type_name}'"
            ))
        })
        .collect()
}

/// Creates the secondary indexes of every registered entity type. Returns
/// the number of statements executed.
///
/// Idempotent; run after `MIGRATOR` on every start.
///
/// # Errors
///
/// Returns `StoreError::InvalidIdentifier` for an unusable type or field
/// name and `StoreError::Unavailable` if a statement fails.
pub async fn bootstrap(pool: &PgPool, registry: &EntityRegistry) -> Result<usize, StoreError> {
    let mut executed = 0;
    for descriptor in registry.iter() {
        for statement in index_statements(descriptor)? {
            sqlx::query(&statement)
                .execute(pool)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            executed += 1;
        }
        info!(
            entity_type = descriptor.type_name,
            indexes = descriptor.indexes.len(),
            "entity indexes ensured"
        );
    }
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::registry::IndexDefinition;

    const NAME_TAG: &[IndexDefinition] = &[IndexDefinition::tag("name", false)];
    const HASH_TAG: &[IndexDefinition] = &[IndexDefinition::tag("password_hash", true)];
    const DESCRIPTION_TEXT: &[IndexDefinition] = &[IndexDefinition::text("description")];
    const QUOTED_FIELD: &[IndexDefinition] =
        &[IndexDefinition::tag("name'; DROP TABLE documents; --", true)];

    fn descriptor(type_name: &'static str, indexes: &'static [IndexDefinition]) -> EntityDescriptor {
        EntityDescriptor {
            type_name,
            indexes,
        }
    }

    #[test]
    fn test_case_insensitive_tag_indexes_lowercased_field() {
        let statements = index_statements(&descriptor("Rose", NAME_TAG)).unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE INDEX IF NOT EXISTS documents_rose_name_tag \
                 ON documents (lower(body ->> 'name')) WHERE collection = 'Rose'"
                    .to_owned()
            ]
        );
    }

    #[test]
    fn test_case_sensitive_tag_indexes_raw_field() {
        let statements = index_statements(&descriptor("User", HASH_TAG)).unwrap();

        assert_eq!(
            statements[0],
            "CREATE INDEX IF NOT EXISTS documents_user_password_hash_tag \
             ON documents ((body ->> 'password_hash')) WHERE collection = 'User'"
        );
    }

    #[test]
    fn test_text_index_uses_gin_over_tsvector() {
        let statements = index_statements(&descriptor("Rose", DESCRIPTION_TEXT)).unwrap();

        assert!(statements[0].contains("USING GIN (to_tsvector('simple'"));
        assert!(statements[0].contains("body ->> 'description'"));
    }

    #[test]
    fn test_quote_in_field_name_is_rejected() {
        let result = index_statements(&descriptor("Rose", QUOTED_FIELD));

        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_type_name_must_be_identifier() {
        let result = index_statements(&descriptor("Rose Garden", &[]));
        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
    }
}
