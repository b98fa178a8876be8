use thiserror::Error;

/// Failure while writing to (or talking to) a storage backend.
///
/// Reads never surface this type to callers: decode and backend faults on
/// the read path become `Decoded::Fault` and degrade to defaults.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected or failed the operation (quota, I/O, poisoned lock).
    #[error("storage backend failed: {0}")]
    Backend(String),

    /// The value could not be serialized.
    #[error("failed to encode value: {0}")]
    Encode(String),
}

impl StorageError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(format!("{err:#}"))
    }
}
