// Error types for store operations

use thiserror::Error;

/// Failures surfaced by [`crate::store::TaskStore`] operations.
///
/// `EmptyText`, `ImportFormat`, and `EmptyExport` are user-action failures:
/// callers report them as a transient warning and carry on. `CorruptState` is
/// raised when persisted content fails to decode; the store recovers from it
/// at startup by falling back to an empty collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task text cannot be empty")]
    EmptyText,

    #[error("imported payload is not a task list")]
    ImportFormat,

    #[error("no tasks to export")]
    EmptyExport,

    #[error("persisted state is corrupt: {0}")]
    CorruptState(#[source] serde_json::Error),

    #[error("store I/O failed")]
    Io(#[from] std::io::Error),

    #[error("serialization failed")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(StoreError::EmptyText.to_string(), "task text cannot be empty");
        assert_eq!(
            StoreError::ImportFormat.to_string(),
            "imported payload is not a task list"
        );
        assert_eq!(StoreError::EmptyExport.to_string(), "no tasks to export");
    }
}
