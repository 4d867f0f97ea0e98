use thiserror::Error;

/// Errors that can occur when building, querying, or persisting a forest.
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown internal index: {0}")]
    UnknownIndex(usize),

    #[error("forest contains no trees")]
    EmptyForest,

    #[error("duplicate external id: {0:?}")]
    DuplicateId(String),

    #[cfg(feature = "persistence")]
    #[error("corrupt index data: {0}")]
    CorruptIndex(String),

    #[cfg(feature = "persistence")]
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for forest operations.
pub type Result<T> = std::result::Result<T, ForestError>;
