//! User feedback on suggested column matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feedback as submitted by a caller, before it is stamped and recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSubmission {
    pub left_column: String,
    pub right_column: String,
    pub is_correct: bool,
    /// The right column the user says should have been suggested instead.
    pub correct_match: Option<String>,
    pub user_note: Option<String>,
    pub name_score: f64,
    pub data_score: f64,
    pub pattern_score: f64,
    /// Confidence (0.0 to 100.0) shown to the user for the judged pair.
    pub confidence: f64,
}

impl FeedbackSubmission {
    pub fn new(left: impl Into<String>, right: impl Into<String>, is_correct: bool) -> Self {
        Self {
            left_column: left.into(),
            right_column: right.into(),
            is_correct,
            ..Self::default()
        }
    }

    pub fn with_correct_match(mut self, column: impl Into<String>) -> Self {
        self.correct_match = Some(column.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.user_note = Some(note.into());
        self
    }

    pub fn with_scores(mut self, name: f64, data: f64, pattern: f64) -> Self {
        self.name_score = name;
        self.data_score = data;
        self.pattern_score = pattern;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Stamp the submission, producing the immutable log entry.
    pub fn into_entry(self, timestamp: DateTime<Utc>) -> FeedbackEntry {
        FeedbackEntry {
            left_column: self.left_column,
            right_column: self.right_column,
            is_correct: self.is_correct,
            correct_match: self.correct_match.filter(|c| !c.is_empty()),
            user_note: self.user_note.filter(|n| !n.is_empty()),
            name_score: self.name_score,
            data_score: self.data_score,
            pattern_score: self.pattern_score,
            confidence: self.confidence,
            timestamp,
        }
    }
}

/// A recorded judgment about one suggested pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub left_column: String,
    pub right_column: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,
    pub name_score: f64,
    pub data_score: f64,
    pub pattern_score: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn is_pair(&self, left: &str, right: &str) -> bool {
        self.left_column == left && self.right_column == right
    }
}

/// A rejected suggestion together with the match the user gave instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// The right column that was wrongly suggested.
    pub suggested: String,
    /// The right column the user says is correct.
    pub correct: String,
    /// How many times this correction was submitted.
    pub count: u32,
}
