//! Adaptive signal weights learned by gradient descent.
//!
//! The match confidence is a weighted sum of four signals. Each feedback
//! batch moves the name, data and pattern weights one step against the
//! squared error of their prediction; the llm weight only moves through
//! renormalization.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use colmatch_model::FeedbackEntry;
use serde::{Deserialize, Serialize};

use crate::io::load_snapshot;
use crate::sync::{read_or_recover, write_or_recover};
use crate::writer::{SnapshotTarget, SnapshotWriter};

/// Lowest value any weight may take.
pub const MIN_WEIGHT: f64 = 0.05;

/// Number of training records kept.
pub const TRAINING_HISTORY_LIMIT: usize = 100;

/// Default gradient descent step size.
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Weights of the four match signals. They are each at least
/// [`MIN_WEIGHT`] and sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeights {
    pub name: f64,
    pub data: f64,
    pub pattern: f64,
    pub llm: f64,
}

impl Default for AdaptiveWeights {
    fn default() -> Self {
        Self {
            name: 0.35,
            data: 0.30,
            pattern: 0.20,
            llm: 0.15,
        }
    }
}

impl AdaptiveWeights {
    pub fn sum(&self) -> f64 {
        self.name + self.data + self.pattern + self.llm
    }

    /// Whether the weights satisfy the floor and sum constraints.
    pub fn is_valid(&self) -> bool {
        self.to_array()
            .iter()
            .all(|w| w.is_finite() && *w >= MIN_WEIGHT - 1e-12)
            && (self.sum() - 1.0).abs() < 1e-9
    }

    fn to_array(self) -> [f64; 4] {
        [self.name, self.data, self.pattern, self.llm]
    }

    fn from_array([name, data, pattern, llm]: [f64; 4]) -> Self {
        Self {
            name,
            data,
            pattern,
            llm,
        }
    }

    /// Floor every weight at [`MIN_WEIGHT`] and rescale to sum to 1.0.
    ///
    /// Weights that a plain rescale would push back under the floor are
    /// pinned to it and the remaining mass is shared among the others.
    #[must_use]
    pub fn constrained(self) -> Self {
        let mut weights = self.to_array().map(|w| {
            if w.is_finite() {
                w.max(MIN_WEIGHT)
            } else {
                MIN_WEIGHT
            }
        });
        let mut pinned = [false; 4];

        loop {
            let pinned_mass = pinned.iter().filter(|p| **p).count() as f64 * MIN_WEIGHT;
            let free_mass: f64 = weights
                .iter()
                .zip(pinned)
                .filter(|(_, p)| !p)
                .map(|(w, _)| *w)
                .sum();
            let scale = (1.0 - pinned_mass) / free_mass;

            let mut newly_pinned = false;
            for (weight, pin) in weights.iter_mut().zip(pinned.iter_mut()) {
                if *pin {
                    continue;
                }
                *weight *= scale;
                if *weight < MIN_WEIGHT {
                    *weight = MIN_WEIGHT;
                    *pin = true;
                    newly_pinned = true;
                }
            }
            if !newly_pinned {
                break;
            }
        }

        Self::from_array(weights)
    }
}

/// One weight update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub timestamp: DateTime<Utc>,
    /// Mean squared error of the batch before the step.
    pub loss: f64,
    /// Weights after the step.
    pub weights: AdaptiveWeights,
    pub batch_size: usize,
}

/// Persisted adaptive learner state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveState {
    pub weights: AdaptiveWeights,
    pub training_history: Vec<TrainingRecord>,
}

/// Learns the signal weights from batches of feedback.
#[derive(Debug)]
pub struct AdaptiveWeightLearner {
    state: RwLock<AdaptiveState>,
    learning_rate: f64,
    snapshot: Option<SnapshotTarget>,
}

impl Default for AdaptiveWeightLearner {
    fn default() -> Self {
        Self::new(DEFAULT_LEARNING_RATE)
    }
}

impl AdaptiveWeightLearner {
    /// In-memory learner with default weights.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            state: RwLock::new(AdaptiveState::default()),
            learning_rate,
            snapshot: None,
        }
    }

    /// Learner backed by the snapshot at `path`, loaded if present.
    pub fn open(path: impl Into<PathBuf>, learning_rate: f64, writer: Arc<SnapshotWriter>) -> Self {
        let target = SnapshotTarget::new(writer, path);
        let mut state: AdaptiveState =
            load_snapshot(target.path(), "adaptive weights").unwrap_or_default();

        if !state.weights.is_valid() {
            tracing::warn!(
                "Stored adaptive weights violate the weight constraints, rescaling {:?}",
                state.weights
            );
            state.weights = state.weights.constrained();
        }
        if state.training_history.len() > TRAINING_HISTORY_LIMIT {
            let excess = state.training_history.len() - TRAINING_HISTORY_LIMIT;
            state.training_history.drain(..excess);
        }

        Self {
            state: RwLock::new(state),
            learning_rate,
            snapshot: Some(target),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn weights(&self) -> AdaptiveWeights {
        read_or_recover(&self.state).weights
    }

    pub fn training_history(&self) -> Vec<TrainingRecord> {
        read_or_recover(&self.state).training_history.clone()
    }

    /// Copy of the full learner state.
    pub fn state(&self) -> AdaptiveState {
        read_or_recover(&self.state).clone()
    }

    /// Weighted sum of the four signals under the current weights.
    pub fn calculate_score(&self, name: f64, data: f64, pattern: f64, llm: f64) -> f64 {
        let w = self.weights();
        name * w.name + data * w.data + pattern * w.pattern + llm * w.llm
    }

    /// Take one gradient step on `batch`. An empty batch is a no-op.
    pub fn update_weights(&self, batch: &[FeedbackEntry]) {
        if batch.is_empty() {
            return;
        }

        let snapshot = {
            let mut state = write_or_recover(&self.state);
            let w = state.weights;
            let n = batch.len() as f64;

            let mut grad_name = 0.0;
            let mut grad_data = 0.0;
            let mut grad_pattern = 0.0;
            let mut total_loss = 0.0;

            for entry in batch {
                let predicted = entry.name_score * w.name
                    + entry.data_score * w.data
                    + entry.pattern_score * w.pattern;
                let target = if entry.is_correct { 1.0 } else { 0.0 };
                let error = predicted - target;

                total_loss += error * error;
                grad_name += error * entry.name_score;
                grad_data += error * entry.data_score;
                grad_pattern += error * entry.pattern_score;
            }

            let stepped = AdaptiveWeights {
                name: w.name - self.learning_rate * grad_name / n,
                data: w.data - self.learning_rate * grad_data / n,
                pattern: w.pattern - self.learning_rate * grad_pattern / n,
                llm: w.llm,
            };
            state.weights = stepped.constrained();

            let loss = total_loss / n;
            let weights = state.weights;
            state.training_history.push(TrainingRecord {
                timestamp: Utc::now(),
                loss,
                weights,
                batch_size: batch.len(),
            });
            if state.training_history.len() > TRAINING_HISTORY_LIMIT {
                let excess = state.training_history.len() - TRAINING_HISTORY_LIMIT;
                state.training_history.drain(..excess);
            }

            let w = state.weights;
            tracing::info!(
                "Weights updated: name={:.3}, data={:.3}, pattern={:.3}, llm={:.3} (loss={:.4})",
                w.name,
                w.data,
                w.pattern,
                w.llm,
                loss
            );

            self.snapshot.as_ref().map(|_| state.clone())
        };

        if let (Some(target), Some(snapshot)) = (&self.snapshot, snapshot) {
            target.submit(snapshot);
        }
    }
}
