use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process has locked the database
    #[error("Another instance of ifac appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// The database file cannot be opened or created (SQLITE_CANTOPEN)
    #[error("Cannot open database file: {0}")]
    CannotOpen(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::InstanceLocked;
        }

        // SQLITE_CANTOPEN (14): bad path, missing directory or no permission
        if error_string.contains("unable to open database file") {
            return DatabaseError::CannotOpen(err.to_string());
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Stored Values
// ============================================================================

/// A value held in the key-value store, decoded from its JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Bool(bool),
    Text(String),
    /// Anything else (numbers, objects, unparsable text).
    Other,
}

impl StoredValue {
    pub(crate) fn decode(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Bool(b)) => StoredValue::Bool(b),
            Ok(serde_json::Value::String(s)) => StoredValue::Text(s),
            _ => StoredValue::Other,
        }
    }

    /// `true` only for a stored boolean `true`; every other value reads as unchecked.
    pub fn as_flag(&self) -> bool {
        matches!(self, StoredValue::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(StoredValue::decode("true"), StoredValue::Bool(true));
        assert_eq!(StoredValue::decode("false"), StoredValue::Bool(false));
        assert_eq!(
            StoredValue::decode(r#""hello""#),
            StoredValue::Text("hello".to_string())
        );
        assert_eq!(StoredValue::decode("42"), StoredValue::Other);
        assert_eq!(StoredValue::decode("{not json"), StoredValue::Other);
    }

    #[test]
    fn test_from_sqlx_classifies_open_failures() {
        let cant_open = sqlx::Error::Protocol("unable to open database file".to_string());
        assert!(matches!(
            DatabaseError::from_sqlx(cant_open),
            DatabaseError::CannotOpen(_)
        ));

        let locked = sqlx::Error::Protocol("database is locked".to_string());
        assert!(matches!(
            DatabaseError::from_sqlx(locked),
            DatabaseError::InstanceLocked
        ));

        let other = sqlx::Error::RowNotFound;
        assert!(matches!(DatabaseError::from_sqlx(other), DatabaseError::Other(_)));
    }

    #[test]
    fn test_only_true_bool_is_a_set_flag() {
        assert!(StoredValue::Bool(true).as_flag());
        assert!(!StoredValue::Bool(false).as_flag());
        assert!(!StoredValue::Text("true".to_string()).as_flag());
        assert!(!StoredValue::Other.as_flag());
    }
}
