//! Stored value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use rusqlite::Error as SqlError;
use serde::de::DeserializeOwned;

use crate::error::StoreResult;

/// Decode a JSON record value
pub fn parse_record<T: DeserializeOwned>(key: &str, raw: &str) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!(key, error = %e, "Stored record is not valid JSON for its type");
        e.into()
    })
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::Presence;

    #[test]
    fn test_parse_record() {
        let presence: Presence = parse_record("k", "\"away\"").unwrap();
        assert_eq!(presence, Presence::Away);

        let bad = parse_record::<Presence>("k", "{not json");
        assert!(matches!(bad, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_optional() {
        let none: Result<i32, SqlError> = Err(SqlError::QueryReturnedNoRows);
        assert_eq!(none.optional().unwrap(), None);

        let some: Result<i32, SqlError> = Ok(3);
        assert_eq!(some.optional().unwrap(), Some(3));

        let err: Result<i32, SqlError> = Err(SqlError::InvalidQuery);
        assert!(err.optional().is_err());
    }
}
