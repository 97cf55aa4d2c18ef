//! Snapshot loading operations.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{LearningError, Result};

/// Load a JSON snapshot.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LearningError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| LearningError::Deserialization {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Load a learner snapshot at startup.
///
/// A missing file yields `None` silently; an unreadable or corrupt file is
/// logged and also yields `None`, so the learner starts from defaults.
pub(crate) fn load_snapshot<T: DeserializeOwned>(path: &Path, label: &str) -> Option<T> {
    match load_json(path) {
        Ok(Some(value)) => {
            tracing::info!("Loaded {label} from {}", path.display());
            Some(value)
        }
        Ok(None) => None,
        Err(error) => {
            tracing::warn!(
                error = %error,
                "Ignoring {label} snapshot, starting from defaults: {}",
                error.user_message()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let loaded: Option<Vec<u32>> = load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_file_is_deserialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, b"{ not json").unwrap();

        let result: Result<Option<Vec<u32>>> = load_json(&path);
        assert!(matches!(result, Err(LearningError::Deserialization { .. })));

        let fallback: Option<Vec<u32>> = load_snapshot(&path, "test");
        assert!(fallback.is_none());
    }
}
