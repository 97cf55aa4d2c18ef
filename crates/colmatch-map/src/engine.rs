//! Column matching engine.
//!
//! Scores every (left, right) column pair of two datasets by combining name,
//! value, pattern and profile signals with the learned weights, then applies
//! feedback, pattern and context adjustments and confidence calibration.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use colmatch_learn::{
    AdaptiveWeightLearner, AdaptiveWeights, ConfidenceCalibrator, FeedbackLearningSystem,
    LearningServices, PatternLearner,
};
use colmatch_model::{
    ColumnProfile, Dataset, DatasetContext, MatchType, ScoreAdjustment, SimilarityResult,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::format::ValueFormat;
use crate::normalized::{MatchEvidence, NORMALIZED_SAMPLE_ROWS, NormalizedValueMatcher};
use crate::patterns::{ValuePattern, detect_pattern};
use crate::quality::DataQualityProfiler;
use crate::synonyms::token_similarity;
use crate::utils::{is_plain_number, jaccard};

/// Default cut-off: pairs at or below this confidence are dropped.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 10.0;
/// Confidence assigned to an explicit custom mapping.
pub const CUSTOM_MAPPING_CONFIDENCE: f64 = 95.0;

/// Pattern signal when both columns share a dominant value pattern.
const SHARED_PATTERN_SCORE: f64 = 0.9;
const QUALITY_POINTS: f64 = 10.0;
const CARDINALITY_POINTS: f64 = 15.0;
const NORMALIZED_POINTS: f64 = 10.0;
const TRANSFORM_MULTIPLIER: f64 = 1.25;
const SYNONYM_MULTIPLIER: f64 = 1.2;
const PRIMARY_KEY_MULTIPLIER: f64 = 1.3;
const PRIMARY_KEY_MIN_OVERLAP: f64 = 0.5;
const SAME_DOMAIN_MULTIPLIER: f64 = 1.1;
const KEY_ENTITY_MULTIPLIER: f64 = 1.15;

/// Leading non-empty values inspected to decide whether a column is numeric.
const NUMERIC_SAMPLE_VALUES: usize = 20;
/// Rows used for the raw value overlap.
const RAW_OVERLAP_ROWS: usize = 500;
/// Parsed values each side needs for a distribution comparison.
const MIN_DISTRIBUTION_VALUES: usize = 5;

/// Options for a matching request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Results at or below this confidence (0 to 100) are dropped.
    pub min_confidence: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Everything about one column that does not depend on the other side.
#[derive(Debug)]
struct ColumnSummary<'a> {
    index: usize,
    name: &'a str,
    profile: ColumnProfile,
    pattern: Option<ValuePattern>,
    format: Option<ValueFormat>,
    numeric: bool,
    numbers: Vec<f64>,
    raw_values: BTreeSet<String>,
    normalized_values: BTreeSet<String>,
}

/// Running confidence with a log of the adjustments applied to it.
struct Score {
    confidence: f64,
    adjustments: Vec<ScoreAdjustment>,
}

impl Score {
    fn adjust(&mut self, name: &str, description: String, after: f64) {
        self.adjustments.push(ScoreAdjustment {
            name: name.to_string(),
            before: self.confidence,
            after,
            description,
        });
        self.confidence = after;
    }

    fn multiply_capped(&mut self, name: &str, description: String, factor: f64) {
        let after = (self.confidence * factor).min(100.0);
        self.adjust(name, description, after);
    }
}

/// Matches columns between two datasets using the shared learners.
///
/// Scoring only takes read locks on the learners, so one service can serve
/// concurrent requests while feedback is being recorded.
#[derive(Debug, Clone)]
pub struct EnhancedSimilarityService {
    weights: Arc<AdaptiveWeightLearner>,
    patterns: Arc<PatternLearner>,
    calibrator: Arc<ConfidenceCalibrator>,
    feedback: Arc<FeedbackLearningSystem>,
    profiler: DataQualityProfiler,
    matcher: NormalizedValueMatcher,
    options: MatchOptions,
}

impl EnhancedSimilarityService {
    pub fn new(
        weights: Arc<AdaptiveWeightLearner>,
        patterns: Arc<PatternLearner>,
        calibrator: Arc<ConfidenceCalibrator>,
        feedback: Arc<FeedbackLearningSystem>,
    ) -> Self {
        Self {
            weights,
            patterns,
            calibrator,
            feedback,
            profiler: DataQualityProfiler::new(),
            matcher: NormalizedValueMatcher::new(),
            options: MatchOptions::default(),
        }
    }

    /// Service sharing the learners of `services`.
    pub fn from_services(services: &LearningServices) -> Self {
        Self::new(
            Arc::clone(services.weights()),
            Arc::clone(services.patterns()),
            Arc::clone(services.calibrator()),
            Arc::clone(services.feedback()),
        )
    }

    #[must_use]
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Compare two datasets without context.
    pub fn compare(&self, left: &Dataset, right: &Dataset) -> Vec<SimilarityResult> {
        self.calculate(left, right, None, None)
    }

    /// Score the column cross product of two datasets.
    ///
    /// Columns excluded by their dataset's context are skipped. Results with
    /// confidence at or below [`MatchOptions::min_confidence`] are dropped;
    /// the rest are sorted by descending confidence, ties by column names.
    pub fn calculate(
        &self,
        left: &Dataset,
        right: &Dataset,
        left_context: Option<&DatasetContext>,
        right_context: Option<&DatasetContext>,
    ) -> Vec<SimilarityResult> {
        if left.column_count() == 0 || right.column_count() == 0 {
            tracing::debug!("Nothing to compare: a dataset has no columns");
            return Vec::new();
        }

        let sample = NORMALIZED_SAMPLE_ROWS
            .min(left.row_count())
            .min(right.row_count());
        let left_columns = self.summarize(left, left_context, sample);
        let right_columns = self.summarize(right, right_context, sample);
        let weights = self.weights.weights();

        let pairs: Vec<_> = left_columns
            .iter()
            .flat_map(|l| right_columns.iter().map(move |r| (l, r)))
            .collect();

        let mut results: Vec<SimilarityResult> = pairs
            .into_par_iter()
            .map(|(l, r)| self.score_pair(l, r, &weights, left_context, right_context))
            .filter(|result| result.confidence > self.options.min_confidence)
            .collect();

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.left_column.cmp(&b.left_column))
                .then_with(|| a.right_column.cmp(&b.right_column))
        });

        tracing::info!(
            "Compared {} x {} columns: {} candidate matches",
            left_columns.len(),
            right_columns.len(),
            results.len()
        );
        results
    }

    /// Score a single column pair, regardless of the confidence cut-off.
    ///
    /// Returns `None` when either column does not exist.
    pub fn compare_columns(
        &self,
        left: &Dataset,
        left_column: &str,
        right: &Dataset,
        right_column: &str,
        left_context: Option<&DatasetContext>,
        right_context: Option<&DatasetContext>,
    ) -> Option<SimilarityResult> {
        let left_index = left.column_index(left_column)?;
        let right_index = right.column_index(right_column)?;
        let sample = NORMALIZED_SAMPLE_ROWS
            .min(left.row_count())
            .min(right.row_count());
        let l = self.summarize_column(left, left_index, sample);
        let r = self.summarize_column(right, right_index, sample);
        Some(self.score_pair(
            &l,
            &r,
            &self.weights.weights(),
            left_context,
            right_context,
        ))
    }

    fn summarize<'a>(
        &self,
        dataset: &'a Dataset,
        context: Option<&DatasetContext>,
        sample: usize,
    ) -> Vec<ColumnSummary<'a>> {
        (0..dataset.column_count())
            .into_par_iter()
            .filter(|&index| {
                context.is_none_or(|ctx| !ctx.is_excluded(&dataset.headers()[index]))
            })
            .map(|index| self.summarize_column(dataset, index, sample))
            .collect()
    }

    fn summarize_column<'a>(
        &self,
        dataset: &'a Dataset,
        index: usize,
        sample: usize,
    ) -> ColumnSummary<'a> {
        let raw_values = dataset
            .column_values(index)
            .take(RAW_OVERLAP_ROWS)
            .flatten()
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
            .collect();
        let normalized_values = dataset
            .column_values(index)
            .take(sample)
            .flatten()
            .map(|value| self.matcher.normalizer().normalize_value(value))
            .filter(|value| !value.is_empty())
            .collect();
        let numbers = dataset
            .column_values(index)
            .flatten()
            .filter_map(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .collect();

        ColumnSummary {
            index,
            name: &dataset.headers()[index],
            profile: self.profiler.profile_column(dataset, index),
            pattern: detect_pattern(dataset, index),
            format: self.matcher.column_format(dataset, index),
            numeric: is_numeric_column(dataset, index),
            numbers,
            raw_values,
            normalized_values,
        }
    }

    fn score_pair(
        &self,
        left: &ColumnSummary<'_>,
        right: &ColumnSummary<'_>,
        weights: &AdaptiveWeights,
        left_context: Option<&DatasetContext>,
        right_context: Option<&DatasetContext>,
    ) -> SimilarityResult {
        let names = token_similarity(left.name, right.name);
        let name_similarity = names.score;

        let shared_pattern = left.pattern.filter(|pattern| Some(*pattern) == right.pattern);
        let pattern_similarity = if shared_pattern.is_some() {
            SHARED_PATTERN_SCORE
        } else {
            0.0
        };
        let mut pattern_match = shared_pattern.map(|pattern| pattern.as_str().to_string());

        let quality_similarity = self.profiler.compare_quality(&left.profile, &right.profile);
        let cardinality_similarity = self
            .matcher
            .cardinality_match(&left.profile, &right.profile);
        let normalized_similarity = overlap(&left.normalized_values, &right.normalized_values);
        let transformation = left
            .format
            .filter(|format| {
                *format != ValueFormat::Text
                    && Some(*format) == right.format
                    && crate::normalized::is_transformation(normalized_similarity)
            });

        let mut distribution_similarity = 0.0;
        let mut value_overlap = 0.0;
        let data_similarity = match (left.numeric, right.numeric) {
            (true, true) => {
                distribution_similarity = distribution_similarity_of(&left.numbers, &right.numbers);
                distribution_similarity
            }
            (false, false) => {
                value_overlap =
                    overlap(&left.raw_values, &right.raw_values).max(normalized_similarity);
                value_overlap
            }
            _ => 0.0,
        };
        let llm_similarity = 0.0;

        let weighted = name_similarity * weights.name
            + data_similarity * weights.data
            + pattern_similarity * weights.pattern
            + llm_similarity * weights.llm;
        let mut score = Score {
            confidence: 100.0 * weighted
                + QUALITY_POINTS * quality_similarity
                + CARDINALITY_POINTS * cardinality_similarity
                + NORMALIZED_POINTS * normalized_similarity,
            adjustments: Vec::new(),
        };

        if let Some(format) = transformation {
            score.multiply_capped(
                "Format transform",
                format!("same {format} values in different notations"),
                TRANSFORM_MULTIPLIER,
            );
            pattern_match = Some(format!("{format}_transform"));
        }

        let feedback_boost = self.feedback.learned_boost(left.name, right.name);
        if feedback_boost != 0.0 {
            let after = score.confidence + feedback_boost * 100.0;
            score.adjust("Feedback", format!("learned boost {feedback_boost:+.2}"), after);
        }

        let pattern_boost = self.patterns.pattern_boost(left.name, right.name);
        if pattern_boost != 0.0 {
            let after = score.confidence + pattern_boost * 100.0;
            score.adjust("Learned pattern", format!("pattern boost {pattern_boost:+.2}"), after);
        }

        if names.synonym {
            score.multiply_capped(
                "Synonym",
                "column names share a synonym".to_string(),
                SYNONYM_MULTIPLIER,
            );
        }

        if left.profile.is_primary_key
            && right.profile.is_primary_key
            && normalized_similarity > PRIMARY_KEY_MIN_OVERLAP
        {
            score.multiply_capped(
                "Primary keys",
                "both columns are keys with overlapping values".to_string(),
                PRIMARY_KEY_MULTIPLIER,
            );
        }

        let custom_mapping = left_context
            .and_then(|ctx| ctx.custom_mapping(left.name))
            .is_some_and(|target| target == right.name);
        if custom_mapping {
            score.adjust(
                "Custom mapping",
                format!("{} is mapped to {}", left.name, right.name),
                CUSTOM_MAPPING_CONFIDENCE,
            );
        } else {
            if let (Some(l), Some(r)) = (left_context, right_context) {
                apply_context(&mut score, left.name, right.name, l, r);
            }

            let calibrated = self.calibrator.calibrate(score.confidence);
            if calibrated != score.confidence {
                score.adjust(
                    "Calibration",
                    "observed accuracy in this confidence range".to_string(),
                    calibrated,
                );
            }
            score.confidence = score.confidence.clamp(0.0, 100.0);
        }

        let match_type = match_type(
            pattern_match.is_some(),
            value_overlap,
            distribution_similarity,
            names.synonym,
            names.score,
            name_similarity,
        );
        let rationale = self.matcher.explain_match(&MatchEvidence {
            name_similarity,
            normalized_similarity,
            cardinality_similarity,
            left_profile: &left.profile,
            right_profile: &right.profile,
            transformation,
        });

        tracing::trace!(
            "{} <-> {} (columns {}, {}): {:.1}",
            left.name,
            right.name,
            left.index,
            right.index,
            score.confidence
        );

        SimilarityResult {
            left_column: left.name.to_string(),
            right_column: right.name.to_string(),
            similarity: score.confidence / 100.0,
            confidence: score.confidence,
            match_type,
            data_similarity,
            name_similarity,
            distribution_similarity,
            pattern_similarity,
            llm_similarity,
            token_similarity: names.score,
            synonym_match: names.synonym,
            pattern_match,
            value_overlap,
            rationale,
            adjustments: score.adjustments,
        }
    }
}

/// Same-domain and key-entity multipliers, applied together and capped.
fn apply_context(
    score: &mut Score,
    left: &str,
    right: &str,
    left_context: &DatasetContext,
    right_context: &DatasetContext,
) {
    let mut factor = 1.0;
    let mut reasons = Vec::new();

    if let Some(domain) = left_context.domain()
        && right_context.domain() == Some(domain)
    {
        factor *= SAME_DOMAIN_MULTIPLIER;
        reasons.push(format!("shared domain {domain}"));
    }

    let left_lower = left.to_lowercase();
    let right_lower = right.to_lowercase();
    if let Some(entity) = left_context.key_entities.iter().find(|entity| {
        let entity = entity.to_lowercase();
        !entity.is_empty() && left_lower.contains(&entity) && right_lower.contains(&entity)
    }) {
        factor *= KEY_ENTITY_MULTIPLIER;
        reasons.push(format!("key entity {entity}"));
    }

    if !reasons.is_empty() {
        score.multiply_capped("Context", reasons.join(", "), factor);
    }
}

fn match_type(
    has_pattern: bool,
    value_overlap: f64,
    distribution: f64,
    synonym: bool,
    token: f64,
    name: f64,
) -> MatchType {
    if has_pattern {
        MatchType::Pattern
    } else if value_overlap > 0.5 {
        MatchType::ValueOverlap
    } else if distribution > 0.5 {
        MatchType::Distribution
    } else if synonym {
        MatchType::Synonym
    } else if token > 0.5 {
        MatchType::Token
    } else if name > 0.3 {
        MatchType::Name
    } else {
        MatchType::Weak
    }
}

/// Greedy one-to-one assignment over ranked results.
///
/// Walks the results by descending confidence and keeps a pair only when
/// neither of its columns has been assigned yet.
pub fn best_matches(results: &[SimilarityResult]) -> Vec<SimilarityResult> {
    let mut ranked: Vec<&SimilarityResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.left_column.cmp(&b.left_column))
            .then_with(|| a.right_column.cmp(&b.right_column))
    });

    let mut assigned_left = BTreeSet::new();
    let mut assigned_right = BTreeSet::new();
    let mut matches = Vec::new();
    for result in ranked {
        if assigned_left.contains(&result.left_column)
            || assigned_right.contains(&result.right_column)
        {
            continue;
        }
        assigned_left.insert(result.left_column.clone());
        assigned_right.insert(result.right_column.clone());
        matches.push(result.clone());
    }
    matches
}

/// Whether the leading non-empty values of a column are all plain numbers.
pub fn is_numeric_column(dataset: &Dataset, column: usize) -> bool {
    let mut seen = false;
    for value in dataset
        .column_values(column)
        .flatten()
        .filter(|value| !value.is_empty())
        .take(NUMERIC_SAMPLE_VALUES)
    {
        if !is_plain_number(value) {
            return false;
        }
        seen = true;
    }
    seen
}

fn overlap(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    jaccard(left.intersection(right).count(), left.len(), right.len())
}

/// Shape similarity of two numeric samples: 0.6 weight on the coefficient of
/// variation, 0.4 on the ratio of ranges.
pub fn distribution_similarity_of(left: &[f64], right: &[f64]) -> f64 {
    if left.len() < MIN_DISTRIBUTION_VALUES || right.len() < MIN_DISTRIBUTION_VALUES {
        return 0.0;
    }

    let cv_similarity = (1.0 - (variation(left) - variation(right)).abs()).max(0.0);
    let left_range = range(left);
    let right_range = range(right);
    let range_similarity = if left_range > 0.0 && right_range > 0.0 {
        left_range.min(right_range) / left_range.max(right_range)
    } else {
        0.0
    };

    0.6 * cv_similarity + 0.4 * range_similarity
}

/// Population coefficient of variation, 0 when the mean is 0.
fn variation(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean.abs()
}

fn range(values: &[f64]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    max - min
}
