use thiserror::Error;

/// The single error type returned by every fallible operation in the graph store.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("index missing: {0}")]
    IndexMissing(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("id space exhausted")]
    IdExhausted,

    #[error("data corruption: {0}")]
    Corruption(String),

    #[error("snapshot is encrypted but no encryption hook is configured")]
    EncryptionRequired,

    #[error("failed to decrypt snapshot: {0}")]
    DecryptFailed(String),

    #[error("store is closed")]
    Closed,

    #[error("store is already closed")]
    AlreadyClosed,

    #[error("kv engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
