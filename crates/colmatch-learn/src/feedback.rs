//! Feedback log, corrections and learning fan-out.
//!
//! Every judgment is appended to an unbounded log and saved before
//! `add_feedback` returns. The slower learners (calibration, patterns and
//! weights) are updated on a background worker fed through a bounded queue.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use colmatch_model::{Correction, FeedbackEntry, FeedbackSubmission};
use serde::{Deserialize, Serialize};

use crate::adaptive::AdaptiveWeightLearner;
use crate::calibration::ConfidenceCalibrator;
use crate::error::{LearningError, Result};
use crate::io::{encode_json, load_snapshot, save_json, write_atomic};
use crate::pattern::PatternLearner;
use crate::sync::{lock_or_recover, read_or_recover, write_or_recover};

/// Boost for a pair the user confirmed.
pub const CONFIRMED_BOOST: f64 = 0.2;
/// Penalty for a pair the user rejected.
pub const REJECTED_PENALTY: f64 = -0.3;
/// Penalty for a pair recorded as a correction.
pub const CORRECTED_PENALTY: f64 = -0.25;
/// Penalty for a right column that was wrongly suggested elsewhere.
pub const WRONG_SUGGESTION_PENALTY: f64 = -0.15;

/// Default number of recent entries used for a weight update.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Persisted feedback store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackData {
    pub matches: Vec<FeedbackEntry>,
    /// Keyed by `"left|right"` of the rejected suggestion.
    pub corrections: BTreeMap<String, Correction>,
}

/// Counts over the whole feedback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_feedback: usize,
    pub correct_matches: usize,
    pub incorrect_matches: usize,
    /// Percentage (0.0 to 100.0).
    pub accuracy: f64,
    pub total_corrections: usize,
}

fn correction_key(left: &str, right: &str) -> String {
    format!("{left}|{right}")
}

/// The learners updated from each piece of feedback.
#[derive(Debug, Clone)]
pub struct Learners {
    pub calibrator: Arc<ConfidenceCalibrator>,
    pub patterns: Arc<PatternLearner>,
    pub weights: Arc<AdaptiveWeightLearner>,
}

impl Learners {
    fn learn(&self, entry: &FeedbackEntry, batch: Option<&[FeedbackEntry]>) {
        self.calibrator.update(entry.confidence, entry.is_correct);

        if entry.is_correct {
            self.patterns
                .learn_from_positive(&entry.left_column, &entry.right_column);
        } else {
            self.patterns.learn_from_negative(
                &entry.left_column,
                &entry.right_column,
                entry.name_score,
                entry.data_score,
            );
        }

        if let Some(batch) = batch {
            self.weights.update_weights(batch);
        }

        tracing::debug!(
            "Learning applied for {} <-> {}",
            entry.left_column,
            entry.right_column
        );
    }
}

enum LearningJob {
    Learn {
        entry: FeedbackEntry,
        batch: Option<Vec<FeedbackEntry>>,
    },
    Drain(SyncSender<()>),
}

/// Background thread applying feedback to the learners in arrival order.
#[derive(Debug)]
pub struct LearningWorker {
    sender: Mutex<Option<SyncSender<LearningJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LearningJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Learn { entry, batch } => f
                .debug_struct("Learn")
                .field("left", &entry.left_column)
                .field("right", &entry.right_column)
                .field("batch", &batch.as_ref().map(Vec::len))
                .finish(),
            Self::Drain(_) => f.write_str("Drain"),
        }
    }
}

impl LearningWorker {
    /// Start the worker with a queue of `capacity` jobs.
    pub fn start(learners: Learners, capacity: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name("feedback-learning".into())
            .spawn(move || run_learning(&learners, &receiver))
            .map_err(|e| LearningError::WorkerSpawn {
                worker: "learning",
                source: e,
            })?;
        tracing::debug!("Learning worker started (queue capacity {capacity})");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn enqueue(&self, job: LearningJob) -> bool {
        let sender = lock_or_recover(&self.sender);
        let Some(sender) = sender.as_ref() else {
            tracing::warn!("Learning worker stopped, dropping {job:?}");
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                tracing::warn!("Learning queue full, dropping {job:?}");
                false
            }
            Err(TrySendError::Disconnected(job)) => {
                tracing::warn!("Learning worker gone, dropping {job:?}");
                false
            }
        }
    }

    /// Block until every job queued before this call has been applied.
    pub fn drain(&self) -> Result<()> {
        let sender = lock_or_recover(&self.sender).clone();
        let Some(sender) = sender else {
            return Err(LearningError::WorkerUnavailable { worker: "learning" });
        };
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        sender
            .send(LearningJob::Drain(done_tx))
            .map_err(|_| LearningError::WorkerUnavailable { worker: "learning" })?;
        done_rx
            .recv()
            .map_err(|_| LearningError::WorkerUnavailable { worker: "learning" })
    }

    /// Apply everything still queued and join the worker thread.
    pub fn shutdown(&self) {
        lock_or_recover(&self.sender).take();
        let handle = lock_or_recover(&self.handle).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Learning worker thread panicked");
            } else {
                tracing::debug!("Learning worker stopped");
            }
        }
    }
}

impl Drop for LearningWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_learning(learners: &Learners, receiver: &Receiver<LearningJob>) {
    while let Ok(job) = receiver.recv() {
        match job {
            LearningJob::Learn { entry, batch } => learners.learn(&entry, batch.as_deref()),
            LearningJob::Drain(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Records user feedback and turns it into learning signals.
#[derive(Debug)]
pub struct FeedbackLearningSystem {
    data: RwLock<FeedbackData>,
    store_path: Option<PathBuf>,
    /// Serializes snapshot + write so concurrent saves never share a temp file.
    persist_lock: Mutex<()>,
    batch_size: usize,
    worker: Option<LearningWorker>,
}

impl Default for FeedbackLearningSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackLearningSystem {
    /// In-memory store with no learners attached.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(FeedbackData::default()),
            store_path: None,
            persist_lock: Mutex::new(()),
            batch_size: DEFAULT_BATCH_SIZE,
            worker: None,
        }
    }

    /// Store backed by the file at `path`, loaded if present.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load_snapshot(&path, "matching feedback").unwrap_or_default();
        Self {
            data: RwLock::new(data),
            store_path: Some(path),
            persist_lock: Mutex::new(()),
            batch_size: DEFAULT_BATCH_SIZE,
            worker: None,
        }
    }

    /// Forward feedback to `learners` on a background worker.
    pub fn with_learners(mut self, learners: Learners, queue_capacity: usize) -> Result<Self> {
        self.worker = Some(LearningWorker::start(learners, queue_capacity)?);
        Ok(self)
    }

    /// Number of recent entries handed to the weight learner.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Validate, stamp and record a judgment, then schedule learning.
    ///
    /// A failure to persist the store is logged and does not fail the call.
    pub fn add_feedback(&self, submission: FeedbackSubmission) -> Result<FeedbackEntry> {
        if submission.left_column.is_empty() {
            return Err(LearningError::MissingColumn { side: "left" });
        }
        if submission.right_column.is_empty() {
            return Err(LearningError::MissingColumn { side: "right" });
        }

        let entry = submission.into_entry(Utc::now());

        let batch = {
            let mut data = write_or_recover(&self.data);
            data.matches.push(entry.clone());

            if !entry.is_correct
                && let Some(correct) = &entry.correct_match
            {
                data.corrections
                    .entry(correction_key(&entry.left_column, &entry.right_column))
                    .and_modify(|c| {
                        c.correct = correct.clone();
                        c.count += 1;
                    })
                    .or_insert_with(|| Correction {
                        suggested: entry.right_column.clone(),
                        correct: correct.clone(),
                        count: 1,
                    });
            }

            (data.matches.len() >= self.batch_size)
                .then(|| data.matches[data.matches.len() - self.batch_size..].to_vec())
        };

        self.persist();

        if let Some(worker) = &self.worker {
            worker.enqueue(LearningJob::Learn {
                entry: entry.clone(),
                batch,
            });
        }

        tracing::info!(
            "Recorded feedback: {} <-> {} (correct: {})",
            entry.left_column,
            entry.right_column,
            entry.is_correct
        );
        Ok(entry)
    }

    /// Wait for queued learning jobs to be applied. A no-op without learners.
    pub fn drain(&self) -> Result<()> {
        match &self.worker {
            Some(worker) => worker.drain(),
            None => Ok(()),
        }
    }

    /// Stop the learning worker after it has applied queued jobs.
    pub fn shutdown(&self) {
        if let Some(worker) = &self.worker {
            worker.shutdown();
        }
    }

    /// Confidence adjustment for a pair learned from past feedback.
    ///
    /// The first recorded judgment of the exact pair wins; then a correction
    /// recorded for the pair; then any correction that rejected `right`.
    pub fn learned_boost(&self, left: &str, right: &str) -> f64 {
        let data = read_or_recover(&self.data);

        if let Some(entry) = data.matches.iter().find(|e| e.is_pair(left, right)) {
            return if entry.is_correct {
                CONFIRMED_BOOST
            } else {
                REJECTED_PENALTY
            };
        }

        if data.corrections.contains_key(&correction_key(left, right)) {
            return CORRECTED_PENALTY;
        }

        if data.corrections.values().any(|c| c.suggested == right) {
            return WRONG_SUGGESTION_PENALTY;
        }

        0.0
    }

    /// Right column learned for `left`: the first confirmed match, else the
    /// correct match of the first correction recorded for `left`.
    pub fn suggested_match(&self, left: &str) -> Option<String> {
        let data = read_or_recover(&self.data);

        if let Some(entry) = data
            .matches
            .iter()
            .find(|e| e.is_correct && e.left_column == left)
        {
            return Some(entry.right_column.clone());
        }

        let prefix = format!("{left}|");
        data.corrections
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .find(|(key, _)| key.len() > prefix.len())
            .map(|(_, correction)| correction.correct.clone())
    }

    pub fn has_positive_feedback(&self, left: &str, right: &str) -> bool {
        read_or_recover(&self.data)
            .matches
            .iter()
            .any(|e| e.is_correct && e.is_pair(left, right))
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent_feedback(&self, n: usize) -> Vec<FeedbackEntry> {
        let data = read_or_recover(&self.data);
        let start = data.matches.len().saturating_sub(n);
        data.matches[start..].to_vec()
    }

    pub fn corrections(&self) -> BTreeMap<String, Correction> {
        read_or_recover(&self.data).corrections.clone()
    }

    pub fn stats(&self) -> FeedbackStats {
        let data = read_or_recover(&self.data);
        let total_feedback = data.matches.len();
        let correct_matches = data.matches.iter().filter(|e| e.is_correct).count();
        let accuracy = if total_feedback > 0 {
            correct_matches as f64 / total_feedback as f64 * 100.0
        } else {
            0.0
        };

        FeedbackStats {
            total_feedback,
            correct_matches,
            incorrect_matches: total_feedback - correct_matches,
            accuracy,
            total_corrections: data.corrections.len(),
        }
    }

    /// Copy of the full feedback store.
    pub fn data(&self) -> FeedbackData {
        read_or_recover(&self.data).clone()
    }

    /// Forget all feedback and corrections and save the empty store.
    pub fn clear(&self) {
        *write_or_recover(&self.data) = FeedbackData::default();
        self.persist();
        tracing::info!("Cleared feedback store");
    }

    fn persist(&self) {
        let Some(path) = &self.store_path else {
            return;
        };

        let _guard = lock_or_recover(&self.persist_lock);
        let encoded = {
            let data = read_or_recover(&self.data);
            encode_json(&*data, path)
        };
        let result = encoded.and_then(|bytes| write_atomic(&bytes, path));
        if let Err(error) = result {
            tracing::warn!(error = %error, "Failed to save feedback: {}", error.user_message());
        }
    }

    /// Save the store now, surfacing any error.
    pub fn save(&self) -> Result<()> {
        match &self.store_path {
            Some(path) => {
                let _guard = lock_or_recover(&self.persist_lock);
                save_json(&*read_or_recover(&self.data), path)
            }
            None => Ok(()),
        }
    }
}
