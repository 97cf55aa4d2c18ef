//! Shared data model for column matching.
//!
//! Datasets, optional business context, per-column profiles, scored match
//! results and user feedback. The types carry no matching or learning logic
//! beyond simple accessors.

pub mod context;
pub mod dataset;
pub mod error;
pub mod feedback;
pub mod profile;
pub mod similarity;

pub use context::DatasetContext;
pub use dataset::Dataset;
pub use error::{ModelError, Result};
pub use feedback::{Correction, FeedbackEntry, FeedbackSubmission};
pub use profile::ColumnProfile;
pub use similarity::{MatchType, ScoreAdjustment, SimilarityResult};
