//! Histogram confidence calibration.
//!
//! Confidences are grouped into ten 10-point buckets. Once a bucket has seen
//! enough judged predictions, predictions falling into it are scaled by the
//! ratio of observed accuracy to the accuracy the bucket midpoint promises.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::load_snapshot;
use crate::sync::{read_or_recover, write_or_recover};
use crate::writer::{SnapshotTarget, SnapshotWriter};

pub const BUCKET_COUNT: usize = 10;

/// Observations a bucket needs before its factor is applied.
pub const MIN_BUCKET_SAMPLES: u32 = 5;

/// Number of calibration records kept.
pub const CALIBRATION_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub range_min: f64,
    pub range_max: f64,
    pub total_count: u32,
    pub correct_count: u32,
    pub actual_accuracy: f64,
    pub calibration_factor: f64,
}

impl CalibrationBucket {
    fn seeded(index: usize) -> Self {
        let range_min = (index * 10) as f64;
        Self {
            range_min,
            range_max: range_min + 10.0,
            total_count: 0,
            correct_count: 0,
            actual_accuracy: (range_min + 5.0) / 100.0,
            calibration_factor: 1.0,
        }
    }

    /// Accuracy a well-calibrated predictor would show in this bucket.
    pub fn expected_accuracy(&self) -> f64 {
        (self.range_min + self.range_max) / 200.0
    }
}

fn seeded_buckets() -> Vec<CalibrationBucket> {
    (0..BUCKET_COUNT).map(CalibrationBucket::seeded).collect()
}

/// Bucket index for a confidence in [0, 100]; out-of-range values clamp.
pub fn bucket_index(confidence: f64) -> usize {
    // `as` saturates and maps NaN to 0.
    ((confidence / 10.0).floor() as i64).clamp(0, BUCKET_COUNT as i64 - 1) as usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub timestamp: DateTime<Utc>,
    pub predicted_confidence: f64,
    pub actual_correct: bool,
    pub calibrated_confidence: f64,
}

/// Persisted calibrator state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationState {
    pub buckets: Vec<CalibrationBucket>,
    pub history: Vec<CalibrationRecord>,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            buckets: seeded_buckets(),
            history: Vec::new(),
        }
    }
}

impl CalibrationState {
    fn calibrate(&self, predicted: f64) -> f64 {
        let bucket = &self.buckets[bucket_index(predicted)];
        if bucket.total_count < MIN_BUCKET_SAMPLES {
            return predicted;
        }
        (predicted * bucket.calibration_factor).clamp(0.0, 100.0)
    }
}

/// Summary across all buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub total_samples: u32,
    pub total_correct: u32,
    /// Percentage (0.0 to 100.0).
    pub overall_accuracy: f64,
    pub buckets: Vec<CalibrationBucket>,
}

/// Corrects predicted confidence using observed accuracy per bucket.
#[derive(Debug, Default)]
pub struct ConfidenceCalibrator {
    state: RwLock<CalibrationState>,
    snapshot: Option<SnapshotTarget>,
}

impl ConfidenceCalibrator {
    /// In-memory calibrator with seeded buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrator backed by the snapshot at `path`, loaded if present.
    ///
    /// A snapshot without exactly ten buckets keeps the seeded buckets but
    /// still restores its history.
    pub fn open(path: impl Into<PathBuf>, writer: Arc<SnapshotWriter>) -> Self {
        let target = SnapshotTarget::new(writer, path);
        let mut state: CalibrationState =
            load_snapshot(target.path(), "confidence calibration").unwrap_or_default();

        if state.buckets.len() != BUCKET_COUNT {
            tracing::warn!(
                "Calibration snapshot has {} buckets, expected {BUCKET_COUNT}; using defaults",
                state.buckets.len()
            );
            state.buckets = seeded_buckets();
        }
        if state.history.len() > CALIBRATION_HISTORY_LIMIT {
            let excess = state.history.len() - CALIBRATION_HISTORY_LIMIT;
            state.history.drain(..excess);
        }

        Self {
            state: RwLock::new(state),
            snapshot: Some(target),
        }
    }

    /// Record whether a prediction at `predicted` confidence was correct.
    pub fn update(&self, predicted: f64, correct: bool) {
        let index = bucket_index(predicted);

        let snapshot = {
            let mut state = write_or_recover(&self.state);
            let bucket = &mut state.buckets[index];

            bucket.total_count += 1;
            if correct {
                bucket.correct_count += 1;
            }
            bucket.actual_accuracy =
                f64::from(bucket.correct_count) / f64::from(bucket.total_count);
            let expected = bucket.expected_accuracy();
            if expected > 0.0 {
                bucket.calibration_factor = bucket.actual_accuracy / expected;
            }
            tracing::debug!(
                "Updated bucket {index}: count={}, accuracy={:.2}, factor={:.2}",
                bucket.total_count,
                bucket.actual_accuracy,
                bucket.calibration_factor
            );

            let calibrated = state.calibrate(predicted);
            state.history.push(CalibrationRecord {
                timestamp: Utc::now(),
                predicted_confidence: predicted,
                actual_correct: correct,
                calibrated_confidence: calibrated,
            });
            if state.history.len() > CALIBRATION_HISTORY_LIMIT {
                let excess = state.history.len() - CALIBRATION_HISTORY_LIMIT;
                state.history.drain(..excess);
            }

            self.snapshot.as_ref().map(|_| state.clone())
        };

        if let (Some(target), Some(snapshot)) = (&self.snapshot, snapshot) {
            target.submit(snapshot);
        }
    }

    /// Calibrated confidence, or `predicted` unchanged while its bucket has
    /// fewer than [`MIN_BUCKET_SAMPLES`] observations.
    pub fn calibrate(&self, predicted: f64) -> f64 {
        read_or_recover(&self.state).calibrate(predicted)
    }

    pub fn buckets(&self) -> Vec<CalibrationBucket> {
        read_or_recover(&self.state).buckets.clone()
    }

    pub fn history(&self) -> Vec<CalibrationRecord> {
        read_or_recover(&self.state).history.clone()
    }

    /// Copy of the full calibrator state.
    pub fn state(&self) -> CalibrationState {
        read_or_recover(&self.state).clone()
    }

    pub fn stats(&self) -> CalibrationStats {
        let state = read_or_recover(&self.state);
        let total_samples: u32 = state.buckets.iter().map(|b| b.total_count).sum();
        let total_correct: u32 = state.buckets.iter().map(|b| b.correct_count).sum();
        let overall_accuracy = if total_samples > 0 {
            f64::from(total_correct) / f64::from(total_samples) * 100.0
        } else {
            0.0
        };

        CalibrationStats {
            total_samples,
            total_correct,
            overall_accuracy,
            buckets: state.buckets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_clamps() {
        assert_eq!(bucket_index(0.0), 0);
        assert_eq!(bucket_index(9.99), 0);
        assert_eq!(bucket_index(10.0), 1);
        assert_eq!(bucket_index(85.0), 8);
        assert_eq!(bucket_index(100.0), 9);
        assert_eq!(bucket_index(250.0), 9);
        assert_eq!(bucket_index(-4.0), 0);
        assert_eq!(bucket_index(f64::NAN), 0);
    }

    #[test]
    fn test_seeded_buckets() {
        let calibrator = ConfidenceCalibrator::new();
        let buckets = calibrator.buckets();
        assert_eq!(buckets.len(), BUCKET_COUNT);
        assert_eq!(buckets[3].range_min, 30.0);
        assert_eq!(buckets[3].range_max, 40.0);
        assert!((buckets[3].actual_accuracy - 0.35).abs() < 1e-12);
        assert_eq!(buckets[3].calibration_factor, 1.0);
    }

    #[test]
    fn test_identity_below_min_samples() {
        let calibrator = ConfidenceCalibrator::new();
        for _ in 0..(MIN_BUCKET_SAMPLES - 1) {
            calibrator.update(85.0, false);
        }
        assert_eq!(calibrator.calibrate(85.0), 85.0);
    }

    #[test]
    fn test_calibrates_after_min_samples() {
        let calibrator = ConfidenceCalibrator::new();
        // 3 of 5 correct in the 80-90 bucket: accuracy 0.6 vs expected 0.85.
        for correct in [true, true, true, false, false] {
            calibrator.update(82.0, correct);
        }
        let factor = 0.6 / 0.85;
        assert!((calibrator.calibrate(85.0) - 85.0 * factor).abs() < 1e-9);
        // Other buckets are untouched.
        assert_eq!(calibrator.calibrate(55.0), 55.0);

        let stats = calibrator.stats();
        assert_eq!(stats.total_samples, 5);
        assert_eq!(stats.total_correct, 3);
        assert!((stats.overall_accuracy - 60.0).abs() < 1e-9);
        assert_eq!(calibrator.history().len(), 5);
    }

    #[test]
    fn test_calibration_clamps_to_hundred() {
        let calibrator = ConfidenceCalibrator::new();
        for _ in 0..5 {
            calibrator.update(5.0, true);
        }
        // Factor 1.0 / 0.05 = 20.
        assert_eq!(calibrator.calibrate(8.0), 100.0);
    }

    #[test]
    fn test_history_is_capped() {
        let calibrator = ConfidenceCalibrator::new();
        for i in 0..(CALIBRATION_HISTORY_LIMIT + 10) {
            calibrator.update((i % 100) as f64, i % 2 == 0);
        }
        let history = calibrator.history();
        assert_eq!(history.len(), CALIBRATION_HISTORY_LIMIT);
        assert_eq!(history[0].predicted_confidence, 10.0);
    }
}
