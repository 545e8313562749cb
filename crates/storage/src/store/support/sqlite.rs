#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::ErrorCode;

/// Read paths treat a table that was never created the same as an empty one.
pub(in crate::store) fn is_missing_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.contains("no such table"),
        _ => false,
    }
}

pub(in crate::store) fn tolerate_missing_table<T: Default>(
    result: Result<T, rusqlite::Error>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if is_missing_table(&err) => Ok(T::default()),
        Err(err) => Err(StoreError::Sql(err)),
    }
}

pub(in crate::store) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

pub(in crate::store) fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

pub(in crate::store) fn bool_to_i64(value: bool) -> i64 {
    if value { 1 } else { 0 }
}
