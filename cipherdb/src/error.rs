//! Error types for the cipherdb wrapper.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::ffi;

/// Result code returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Classifies the primary result code (the low byte, so extended codes
    /// such as `SQLITE_CONSTRAINT_UNIQUE` map to their primary category).
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self.0 & 0xff {
            ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => ErrorCategory::Busy,
            ffi::SQLITE_CONSTRAINT => ErrorCategory::Constraint,
            ffi::SQLITE_NOTADB => ErrorCategory::NotADatabase,
            ffi::SQLITE_CANTOPEN => ErrorCategory::CantOpen,
            ffi::SQLITE_READONLY => ErrorCategory::ReadOnly,
            ffi::SQLITE_PERM | ffi::SQLITE_AUTH => ErrorCategory::Permission,
            ffi::SQLITE_RANGE | ffi::SQLITE_MISMATCH | ffi::SQLITE_TOOBIG => {
                ErrorCategory::Binding
            }
            ffi::SQLITE_MISUSE => ErrorCategory::Misuse,
            ffi::SQLITE_CORRUPT | ffi::SQLITE_IOERR | ffi::SQLITE_FULL => ErrorCategory::Storage,
            ffi::SQLITE_INTERRUPT | ffi::SQLITE_ABORT => ErrorCategory::Interrupted,
            ffi::SQLITE_DONE => ErrorCategory::NoRows,
            _ => ErrorCategory::Sql,
        }
    }

    /// The engine's own description of this code (`sqlite3_errstr`).
    #[must_use]
    pub fn description(self) -> String {
        ffi::error_string(self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse classification of engine result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Generic SQL error: syntax, missing table or column.
    Sql,
    /// Database busy or locked by another connection.
    Busy,
    /// Constraint violation.
    Constraint,
    /// File is not a database, or the cipher key is wrong.
    NotADatabase,
    /// The database file could not be opened.
    CantOpen,
    /// Write attempted on a read-only database.
    ReadOnly,
    /// Access denied.
    Permission,
    /// Parameter index, type or size problem while binding.
    Binding,
    /// API used incorrectly.
    Misuse,
    /// Disk, I/O or corruption failure.
    Storage,
    /// Operation interrupted or aborted.
    Interrupted,
    /// A single-row query produced no row.
    NoRows,
}

/// Error returned by cipherdb operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The engine rejected an open, prepare, bind, step or exec call.
    #[error("sqlite error {code}: {message}")]
    Engine {
        /// Engine result code.
        code: ErrorCode,
        /// Human-readable message (from `sqlite3_errmsg` when available).
        message: String,
    },

    /// Text under a date, time, datetime or decimal column did not parse.
    #[error("cannot decode {value:?} in column {column:?} declared {declared}")]
    Coercion {
        /// Column name.
        column: String,
        /// Declared column type as reported by the engine.
        declared: String,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A serialized request exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The serializing server has stopped.
    #[error("server is closed")]
    Closed,
}

impl DbError {
    /// Creates an engine error.
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self::Engine {
            code: ErrorCode(code),
            message: message.into(),
        }
    }

    /// Returns the engine result code, if this is an engine error.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the engine error category, if this is an engine error.
    #[must_use]
    pub const fn category(&self) -> Option<ErrorCategory> {
        match self.code() {
            Some(code) => Some(code.category()),
            None => None,
        }
    }

    /// `true` for [`DbError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Terse call shape for fallible operations: abort instead of returning.
///
/// ```rust,ignore
/// let rows = conn.query("SELECT 1", &[], RowShape::Pairs).or_raise();
/// ```
pub trait OrRaise<T> {
    /// Returns the success value, or panics with the error message.
    ///
    /// # Panics
    ///
    /// Panics when the result is an error.
    fn or_raise(self) -> T;
}

impl<T> OrRaise<T> for DbResult<T> {
    #[track_caller]
    fn or_raise(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_codes_map_to_primary_category() {
        // SQLITE_CONSTRAINT_UNIQUE
        assert_eq!(ErrorCode(2067).category(), ErrorCategory::Constraint);
        assert_eq!(ErrorCode(ffi::SQLITE_BUSY).category(), ErrorCategory::Busy);
        assert_eq!(ErrorCode(ffi::SQLITE_ERROR).category(), ErrorCategory::Sql);
    }

    #[test]
    fn engine_error_display() {
        let err = DbError::new(ffi::SQLITE_ERROR, "no such table: t");
        assert_eq!(err.to_string(), "sqlite error 1: no such table: t");
        assert_eq!(err.category(), Some(ErrorCategory::Sql));
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_has_no_engine_code() {
        let err = DbError::Timeout(Duration::from_millis(5));
        assert!(err.is_timeout());
        assert_eq!(err.code(), None);
    }

    #[test]
    fn or_raise_passes_success_through() {
        let ok: DbResult<i32> = Ok(7);
        assert_eq!(ok.or_raise(), 7);
    }

    #[test]
    #[should_panic(expected = "sqlite error 19: UNIQUE constraint failed")]
    fn or_raise_panics_with_message() {
        let err: DbResult<()> = Err(DbError::new(19, "UNIQUE constraint failed"));
        err.or_raise();
    }
}
