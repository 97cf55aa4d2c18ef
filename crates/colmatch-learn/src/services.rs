//! Construction and shutdown of the learning services.

use std::fs;
use std::sync::Arc;

use crate::adaptive::AdaptiveWeightLearner;
use crate::calibration::ConfidenceCalibrator;
use crate::config::LearningConfig;
use crate::error::{LearningError, Result};
use crate::feedback::{FeedbackLearningSystem, Learners};
use crate::pattern::PatternLearner;
use crate::writer::SnapshotWriter;

/// The four learners plus the snapshot writer they share.
///
/// Built once per process and handed out by `Arc`. Dropping the services
/// (or calling [`LearningServices::shutdown`]) applies queued learning and
/// writes pending snapshots before the worker threads are joined.
#[derive(Debug)]
pub struct LearningServices {
    config: LearningConfig,
    weights: Arc<AdaptiveWeightLearner>,
    patterns: Arc<PatternLearner>,
    calibrator: Arc<ConfidenceCalibrator>,
    feedback: Arc<FeedbackLearningSystem>,
    writer: Option<Arc<SnapshotWriter>>,
}

impl LearningServices {
    /// Open the services over `config.data_dir`, loading any snapshots.
    pub fn open(config: LearningConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| LearningError::Io {
            operation: "create directory",
            path: config.data_dir.clone(),
            source: e,
        })?;

        let writer = Arc::new(SnapshotWriter::start()?);
        let weights = Arc::new(AdaptiveWeightLearner::open(
            config.adaptive_weights_path(),
            config.learning_rate,
            Arc::clone(&writer),
        ));
        let patterns = Arc::new(PatternLearner::open(
            config.pattern_learning_path(),
            Arc::clone(&writer),
        ));
        let calibrator = Arc::new(ConfidenceCalibrator::open(
            config.calibration_path(),
            Arc::clone(&writer),
        ));
        let learners = Learners {
            calibrator: Arc::clone(&calibrator),
            patterns: Arc::clone(&patterns),
            weights: Arc::clone(&weights),
        };
        let feedback = Arc::new(
            FeedbackLearningSystem::open(config.feedback_path())
                .with_batch_size(config.weight_batch_size)
                .with_learners(learners, config.learning_queue_capacity)?,
        );

        tracing::info!("Learning services opened at {}", config.data_dir.display());
        Ok(Self {
            config,
            weights,
            patterns,
            calibrator,
            feedback,
            writer: Some(writer),
        })
    }

    /// Services that keep all state in memory and never touch disk.
    pub fn in_memory(config: LearningConfig) -> Result<Self> {
        let weights = Arc::new(AdaptiveWeightLearner::new(config.learning_rate));
        let patterns = Arc::new(PatternLearner::new());
        let calibrator = Arc::new(ConfidenceCalibrator::new());
        let learners = Learners {
            calibrator: Arc::clone(&calibrator),
            patterns: Arc::clone(&patterns),
            weights: Arc::clone(&weights),
        };
        let feedback = Arc::new(
            FeedbackLearningSystem::new()
                .with_batch_size(config.weight_batch_size)
                .with_learners(learners, config.learning_queue_capacity)?,
        );

        Ok(Self {
            config,
            weights,
            patterns,
            calibrator,
            feedback,
            writer: None,
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn weights(&self) -> &Arc<AdaptiveWeightLearner> {
        &self.weights
    }

    pub fn patterns(&self) -> &Arc<PatternLearner> {
        &self.patterns
    }

    pub fn calibrator(&self) -> &Arc<ConfidenceCalibrator> {
        &self.calibrator
    }

    pub fn feedback(&self) -> &Arc<FeedbackLearningSystem> {
        &self.feedback
    }

    /// Apply queued learning, then wait for every pending snapshot write.
    pub fn flush(&self) -> Result<()> {
        self.feedback.drain()?;
        if let Some(writer) = &self.writer {
            writer.flush();
        }
        Ok(())
    }

    /// Stop both workers after they finish queued work.
    pub fn shutdown(&self) {
        self.feedback.shutdown();
        if let Some(writer) = &self.writer {
            writer.shutdown();
        }
        tracing::debug!("Learning services shut down");
    }
}

impl Drop for LearningServices {
    fn drop(&mut self) {
        self.shutdown();
    }
}
