use crate::storage::StorageError;

/// Errors surfaced by the query builder and executor.
#[derive(Debug)]
pub enum QueryError {
    /// The caller supplied something the builder cannot compile, such as an
    /// unknown operator token or a malformed operand.
    InvalidArgument(String),
    /// The builder was run in a state that makes no sense, such as a
    /// terminal call with no table selected.
    IllegalState(String),
    Store(StorageError),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::IllegalState(msg) => write!(f, "Illegal state: {msg}"),
            Self::Store(e) => write!(f, "Storage error: {e}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(e: StorageError) -> Self {
        Self::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
