//! Shared helper functions for PostgreSQL row conversion.

use tally_core::error::{StorageError, StorageResult};

/// Read back a block number stored as `BIGINT`.
pub fn block_height(value: i64) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!(
            "indexer_cursor.last_indexed_block is negative: {}",
            value
        ))
    })
}

/// Map a query failure, keeping unique violations distinguishable.
pub fn query_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::ConstraintViolation(db.message().to_string())
        }
        _ => StorageError::QueryError(e.to_string()),
    }
}

/// Render a balance for a `NUMERIC` column.
///
/// u128 does not fit any native Postgres integer, so amounts travel as
/// decimal text and are cast server side.
pub fn numeric(value: u128) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: une hauteur négative en base ne doit jamais devenir un curseur
    #[test]
    fn test_negative_height_is_rejected() {
        assert_eq!(block_height(42).unwrap(), 42);
        let err = block_height(-1).unwrap_err().to_string();
        assert!(err.contains("last_indexed_block"));
    }

    #[test]
    fn test_non_database_errors_are_query_errors() {
        assert!(matches!(
            query_error(sqlx::Error::RowNotFound),
            StorageError::QueryError(_)
        ));
    }

    #[test]
    fn test_numeric_keeps_full_u128_precision() {
        assert_eq!(numeric(u128::MAX), "340282366920938463463374607431768211455");
        assert_eq!(numeric(0), "0");
    }
}
