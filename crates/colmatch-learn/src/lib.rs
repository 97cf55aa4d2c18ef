//! Continuous learning for column matching.
//!
//! Four learners adjust the matching pipeline from user feedback:
//!
//! - **Adaptive weights**: gradient descent over the four signal weights
//! - **Pattern learning**: `*_suffix` / `prefix*` rules and token equivalences
//! - **Confidence calibration**: a ten-bucket accuracy histogram
//! - **Feedback**: the judgment log, corrections and learned boosts
//!
//! # Persistence
//!
//! Each learner owns one JSON snapshot under the configured data directory:
//!
//! ```text
//! data/
//! ├── adaptive_weights.json        weights + training history
//! ├── pattern_learning.json        pattern rules + token mappings
//! ├── confidence_calibration.json  buckets + calibration history
//! └── matching_feedback.json       feedback log + corrections
//! ```
//!
//! Snapshots are written atomically (temp file + rename). The feedback store
//! is saved before `add_feedback` returns; the other learners hand their
//! state to a coalescing [`SnapshotWriter`] thread.
//!
//! # Example
//!
//! ```ignore
//! use colmatch_learn::{LearningConfig, LearningServices};
//! use colmatch_model::FeedbackSubmission;
//!
//! let services = LearningServices::open(LearningConfig::with_data_dir("data"))?;
//! services
//!     .feedback()
//!     .add_feedback(FeedbackSubmission::new("cust_id", "customer_id", true))?;
//! services.shutdown();
//! ```

mod adaptive;
mod calibration;
mod config;
mod error;
mod feedback;
mod io;
mod pattern;
mod services;
mod sync;
mod writer;

pub use adaptive::{
    AdaptiveState, AdaptiveWeightLearner, AdaptiveWeights, DEFAULT_LEARNING_RATE, MIN_WEIGHT,
    TRAINING_HISTORY_LIMIT, TrainingRecord,
};
pub use calibration::{
    BUCKET_COUNT, CALIBRATION_HISTORY_LIMIT, CalibrationBucket, CalibrationRecord,
    CalibrationState, CalibrationStats, ConfidenceCalibrator, MIN_BUCKET_SAMPLES, bucket_index,
};
pub use config::{
    ADAPTIVE_WEIGHTS_FILE, CONFIDENCE_CALIBRATION_FILE, LearningConfig, MATCHING_FEEDBACK_FILE,
    PATTERN_LEARNING_FILE,
};
pub use error::{LearningError, Result};
pub use feedback::{
    CONFIRMED_BOOST, CORRECTED_PENALTY, FeedbackData, FeedbackLearningSystem, FeedbackStats,
    Learners, LearningWorker, REJECTED_PENALTY, WRONG_SUGGESTION_PENALTY,
};
pub use io::{load_json, save_json};
pub use pattern::{
    PatternLearner, PatternRule, PatternState, TokenMapping, extract_pattern, pattern_confidence,
    tokenize_column,
};
pub use services::LearningServices;
pub use writer::{SnapshotTarget, SnapshotWriter};
