#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove patient record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize patient: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize patient: {0}")]
    Deserialization(serde_json::Error),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("queue state lock poisoned")]
    LockPoisoned,
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
