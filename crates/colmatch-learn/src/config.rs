//! Learning configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Snapshot file for the adaptive weights and their training history.
pub const ADAPTIVE_WEIGHTS_FILE: &str = "adaptive_weights.json";
/// Snapshot file for learned pattern rules and token mappings.
pub const PATTERN_LEARNING_FILE: &str = "pattern_learning.json";
/// Snapshot file for calibration buckets and history.
pub const CONFIDENCE_CALIBRATION_FILE: &str = "confidence_calibration.json";
/// Snapshot file for the feedback log and corrections.
pub const MATCHING_FEEDBACK_FILE: &str = "matching_feedback.json";

/// Configuration for the learning services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Directory holding the four snapshot files.
    pub data_dir: PathBuf,

    /// Gradient descent step size for the adaptive weights.
    pub learning_rate: f64,

    /// Number of most recent feedback entries used per weight update.
    /// Weights are only updated once the log holds at least this many entries.
    pub weight_batch_size: usize,

    /// Capacity of the background learning queue. Jobs submitted while the
    /// queue is full are dropped with a warning.
    pub learning_queue_capacity: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            learning_rate: 0.01,
            weight_batch_size: 10,
            learning_queue_capacity: 1024,
        }
    }
}

impl LearningConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn adaptive_weights_path(&self) -> PathBuf {
        self.data_dir.join(ADAPTIVE_WEIGHTS_FILE)
    }

    pub fn pattern_learning_path(&self) -> PathBuf {
        self.data_dir.join(PATTERN_LEARNING_FILE)
    }

    pub fn calibration_path(&self) -> PathBuf {
        self.data_dir.join(CONFIDENCE_CALIBRATION_FILE)
    }

    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join(MATCHING_FEEDBACK_FILE)
    }
}
