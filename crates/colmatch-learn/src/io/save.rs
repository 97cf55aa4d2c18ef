//! Snapshot saving operations.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{LearningError, Result};

/// Save a value as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) so a crash mid-write never leaves
/// a truncated snapshot behind.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let bytes = encode_json(value, path)?;
    write_atomic(&bytes, path)
}

/// Encode a value as pretty-printed JSON bytes destined for `path`.
pub fn encode_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| LearningError::Serialization {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write bytes to `path` through a synced temp file and a rename.
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LearningError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| LearningError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(bytes).map_err(|e| LearningError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| LearningError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| LearningError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!("Saved snapshot to {}", path.display());
    Ok(())
}
