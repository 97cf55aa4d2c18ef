//! Learning and persistence error types.
//!
//! Errors carry enough context to produce a user-facing message and an
//! optional remediation hint.

use std::path::PathBuf;
use thiserror::Error;

/// Learning subsystem error.
#[derive(Debug, Error)]
pub enum LearningError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded.
    #[error("Failed to serialize snapshot for {path}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot file exists but could not be decoded.
    #[error("Failed to deserialize snapshot {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Feedback named an empty column.
    #[error("Feedback is missing the {side} column name")]
    MissingColumn { side: &'static str },

    /// A background worker could not be started.
    #[error("Failed to start the {worker} worker")]
    WorkerSpawn {
        worker: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A background worker has already stopped.
    #[error("The {worker} worker is not running")]
    WorkerUnavailable { worker: &'static str },
}

impl LearningError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::Serialization { path, .. } => {
                format!("An error occurred while encoding {}.", path.display())
            }
            Self::Deserialization { path, .. } => {
                format!(
                    "The learned state in {} could not be read. The file may be corrupted.",
                    path.display()
                )
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::MissingColumn { side } => {
                format!("Feedback must name the {side} column.")
            }
            Self::WorkerSpawn { worker, .. } => {
                format!("The background {worker} worker could not be started.")
            }
            Self::WorkerUnavailable { worker } => {
                format!("The background {worker} worker has stopped.")
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to the data directory.".into())
                }
            }
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } => {
                Some("Remove the file to start again from default learned state.".into())
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or choose a different data directory.".into())
            }
            Self::MissingColumn { .. } => {
                Some("Provide both the left and the right column names.".into())
            }
            Self::WorkerSpawn { .. } => {
                Some("Check the system thread limits and try again.".into())
            }
            Self::WorkerUnavailable { .. } => None,
        }
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_messages() {
        let err = LearningError::MissingColumn { side: "left" };
        assert_eq!(err.to_string(), "Feedback is missing the left column name");
        assert!(err.user_message().contains("left"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_io_suggestion_depends_on_operation() {
        let read = LearningError::Io {
            operation: "read",
            path: PathBuf::from("data/x.json"),
            source: std::io::Error::other("boom"),
        };
        let write = LearningError::Io {
            operation: "write",
            path: PathBuf::from("data/x.json"),
            source: std::io::Error::other("boom"),
        };
        assert_ne!(read.suggestion(), write.suggestion());
        assert_eq!(read.to_string(), "Failed to read file: data/x.json");
    }
}
