//! # Database Error Types
//!
//! ```text
//! sqlx::Error / MigrateError / serde_json::Error
//!        │
//!        ▼
//!     DbError ──► ApiError (register) ──► JSON response line
//! ```
//!
//! Only the coupon and key-value repositories produce these, so the set is
//! small: a missing code, a duplicate code, a row that is not a coupon, and
//! SQLite itself failing.

use thiserror::Error;

/// Errors from the coupon and key-value tables.
#[derive(Debug, Error)]
pub enum DbError {
    /// Update or delete of a coupon code that is not stored.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Insert of a coupon code that already exists.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A stored row, or a coupon about to be stored, that does not describe
    /// a valid coupon (e.g. a `buy_x_get_y` row without `buy_quantity`, or a
    /// `categories` column that is not a JSON string array).
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The embedded migrations could not be applied.
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// SQLite or the pool failed: cannot open the file, a statement
    /// failed, the pool is closed or timed out.
    #[error("SQLite error: {0}")]
    Sqlite(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        DbError::InvalidRecord(reason.into())
    }
}

/// `UNIQUE constraint failed: coupons.code` becomes `UniqueViolation` on
/// `coupons.code`; the caller fills in the value. Column decode failures
/// are bad rows. Everything else is `Sqlite`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match msg.strip_prefix("UNIQUE constraint failed: ") {
                    Some(column) => DbError::duplicate(column, String::new()),
                    None => DbError::Sqlite(msg.to_string()),
                }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::InvalidRecord(format!("column {}: {}", index, source))
            }
            other => DbError::Sqlite(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::InvalidRecord(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_pool_is_a_sqlite_error() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[test]
    fn test_bad_categories_json_is_an_invalid_record() {
        let err: DbError = serde_json::from_str::<Vec<String>>("{").unwrap_err().into();
        assert!(matches!(err, DbError::InvalidRecord(_)));
    }
}
