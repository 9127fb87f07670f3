//! Error types for Reflux.

use crate::document::DocId;
use alloc::string::String;
use core::fmt;

/// Result type alias for Reflux operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Reflux operations.
///
/// A change event that cannot be applied incrementally is not an error; it is
/// reported as a full re-query request by the incremental engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The storage backend failed to answer a request.
    Storage {
        message: String,
    },
    /// A document was expected but does not exist.
    DocumentNotFound {
        id: DocId,
    },
    /// A query shape is malformed.
    InvalidQuery {
        message: String,
    },
    /// The collection has been closed.
    ClosedCollection {
        name: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage { message } => {
                write!(f, "Storage error: {}", message)
            }
            Error::DocumentNotFound { id } => {
                write!(f, "Document not found: {}", id)
            }
            Error::InvalidQuery { message } => {
                write!(f, "Invalid query: {}", message)
            }
            Error::ClosedCollection { name } => {
                write!(f, "Collection is closed: {}", name)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
        }
    }

    /// Creates a document not found error.
    pub fn document_not_found(id: impl Into<DocId>) -> Self {
        Error::DocumentNotFound { id: id.into() }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a closed collection error.
    pub fn closed_collection(name: impl Into<String>) -> Self {
        Error::ClosedCollection { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error came from the storage backend.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::storage("backend offline");
        assert!(err.to_string().contains("backend offline"));

        let err = Error::document_not_found("a");
        assert!(err.to_string().contains("a"));

        let err = Error::closed_collection("users");
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::invalid_query("limit must be set");
        match err {
            Error::InvalidQuery { message } => assert_eq!(message, "limit must be set"),
            _ => panic!("Wrong error type"),
        }
        assert!(Error::storage("x").is_storage());
        assert!(!Error::invalid_operation("x").is_storage());
    }
}
