//! Error types for adsdb operations.
//!
//! The taxonomy mirrors the DB-API exception hierarchy: an interface-level
//! error for misuse of the driver, and a family of database errors that all
//! carry the native message and numeric code.

use thiserror::Error;

/// Code reported for database errors that did not originate in the native
/// library.
pub const NO_NATIVE_CODE: i32 = -1;

/// The primary error type for all adsdb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Misuse of the driver: closed connection or cursor, fetch before
    /// execute, malformed connection target.
    #[error("interface error: {0}")]
    Interface(String),
    /// Unclassified native failure.
    #[error("database error: {0}")]
    Database(DatabaseError),
    /// A parameter value cannot be represented in its native encoding.
    #[error("data error: {0}")]
    Data(DatabaseError),
    /// A native call reported failure, or a value could not be decoded.
    #[error("operational error: {0}")]
    Operational(DatabaseError),
    /// Reserved for constraint violations.
    #[error("integrity error: {0}")]
    Integrity(DatabaseError),
    /// Handle allocation or engine initialization failed.
    #[error("internal error: {0}")]
    Internal(DatabaseError),
    /// Reserved for SQL or API usage errors reported by the engine.
    #[error("programming error: {0}")]
    Programming(DatabaseError),
    /// The engine does not support the requested operation or version.
    #[error("not supported: {0}")]
    NotSupported(DatabaseError),
}

/// Message and numeric code attached to every database-family error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct DatabaseError {
    pub message: String,
    pub code: i32,
}

/// Discriminant of [`Error`] for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Interface,
    Database,
    Data,
    Operational,
    Integrity,
    Internal,
    Programming,
    NotSupported,
}

impl DatabaseError {
    /// Create an error with an explicit native code.
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Create an error that did not come from the native library.
    pub fn local(message: impl Into<String>) -> Self {
        Self::new(message, NO_NATIVE_CODE)
    }
}

impl Error {
    /// Interface error with the given message.
    pub fn interface(message: impl Into<String>) -> Self {
        Error::Interface(message.into())
    }

    /// Data error raised locally (no native code).
    pub fn data(message: impl Into<String>) -> Self {
        Error::Data(DatabaseError::local(message))
    }

    /// Operational error raised locally (no native code).
    pub fn operational(message: impl Into<String>) -> Self {
        Error::Operational(DatabaseError::local(message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Interface(_) => ErrorKind::Interface,
            Error::Database(_) => ErrorKind::Database,
            Error::Data(_) => ErrorKind::Data,
            Error::Operational(_) => ErrorKind::Operational,
            Error::Integrity(_) => ErrorKind::Integrity,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Programming(_) => ErrorKind::Programming,
            Error::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    /// The database payload, if this is a database-family error.
    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self {
            Error::Interface(_) => None,
            Error::Database(e)
            | Error::Data(e)
            | Error::Operational(e)
            | Error::Integrity(e)
            | Error::Internal(e)
            | Error::Programming(e)
            | Error::NotSupported(e) => Some(e),
        }
    }

    /// Is this any member of the database-error family?
    pub fn is_database_error(&self) -> bool {
        self.database_error().is_some()
    }

    /// Numeric code for programmatic branching (`None` for interface errors).
    pub fn code(&self) -> Option<i32> {
        self.database_error().map(|e| e.code)
    }

    /// Human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Interface(msg) => msg,
            other => other
                .database_error()
                .map_or("", |e| e.message.as_str()),
        }
    }
}

/// Result type alias for adsdb operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_family_carries_code() {
        let err = Error::Operational(DatabaseError::new("table not found", 7041));
        assert_eq!(err.kind(), ErrorKind::Operational);
        assert_eq!(err.code(), Some(7041));
        assert_eq!(err.message(), "table not found");
        assert!(err.is_database_error());
        assert_eq!(err.to_string(), "operational error: [7041] table not found");
    }

    #[test]
    fn interface_errors_have_no_code() {
        let err = Error::interface("cursor closed");
        assert_eq!(err.kind(), ErrorKind::Interface);
        assert_eq!(err.code(), None);
        assert!(!err.is_database_error());
        assert_eq!(err.message(), "cursor closed");
    }

    #[test]
    fn local_errors_use_sentinel_code() {
        let err = Error::data("Value out of range 99999999999999999999");
        assert_eq!(err.code(), Some(NO_NATIVE_CODE));
    }

    #[test]
    fn database_error_displays_code_first() {
        let err = DatabaseError::new("Discovery failed", 6420);
        assert_eq!(err.to_string(), "[6420] Discovery failed");
        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }
}
