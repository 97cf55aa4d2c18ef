//! Value comparison after format normalization.

use std::collections::BTreeSet;

use colmatch_model::{ColumnProfile, Dataset};

use crate::format::{FormatNormalizer, ValueFormat};
use crate::utils::jaccard;

/// Rows sampled from each column for the normalized overlap.
pub const NORMALIZED_SAMPLE_ROWS: usize = 200;
/// Rows scanned per column when detecting its format.
pub const FORMAT_SAMPLE_ROWS: usize = 10;
/// Normalized overlap needed before a shared format counts as a transformation.
const TRANSFORM_MIN_OVERLAP: f64 = 0.5;

/// Evidence summarized by [`NormalizedValueMatcher::explain_match`].
#[derive(Debug, Clone, Copy)]
pub struct MatchEvidence<'a> {
    pub name_similarity: f64,
    pub normalized_similarity: f64,
    pub cardinality_similarity: f64,
    pub left_profile: &'a ColumnProfile,
    pub right_profile: &'a ColumnProfile,
    pub transformation: Option<ValueFormat>,
}

/// Compares columns on their normalized values and cardinality.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedValueMatcher {
    normalizer: FormatNormalizer,
}

impl NormalizedValueMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalizer(&self) -> &FormatNormalizer {
        &self.normalizer
    }

    /// Jaccard overlap of the normalized values of two columns.
    ///
    /// Both columns are sampled over the same number of leading rows, at most
    /// [`NORMALIZED_SAMPLE_ROWS`]. Returns 0 when either side has no values.
    pub fn normalized_match(
        &self,
        left: &Dataset,
        left_column: usize,
        right: &Dataset,
        right_column: usize,
    ) -> f64 {
        let sample = NORMALIZED_SAMPLE_ROWS
            .min(left.row_count())
            .min(right.row_count());
        let left_values = self.normalized_set(left, left_column, sample);
        let right_values = self.normalized_set(right, right_column, sample);
        let intersection = left_values.intersection(&right_values).count();
        jaccard(intersection, left_values.len(), right_values.len())
    }

    fn normalized_set(&self, dataset: &Dataset, column: usize, sample: usize) -> BTreeSet<String> {
        dataset
            .column_values(column)
            .take(sample)
            .flatten()
            .map(|value| self.normalizer.normalize_value(value))
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Format of a column: the first non-text format among its leading rows,
    /// `Text` if every value there is text, `None` if they are all empty.
    pub fn column_format(&self, dataset: &Dataset, column: usize) -> Option<ValueFormat> {
        let mut format = None;
        for value in dataset
            .column_values(column)
            .take(FORMAT_SAMPLE_ROWS)
            .flatten()
            .filter(|value| !value.trim().is_empty())
        {
            let detected = self.normalizer.detect_format(value);
            format = Some(detected);
            if detected != ValueFormat::Text {
                break;
            }
        }
        format
    }

    /// Non-text format shared by both columns, regardless of value overlap.
    pub fn shared_format(
        &self,
        left: &Dataset,
        left_column: usize,
        right: &Dataset,
        right_column: usize,
    ) -> Option<ValueFormat> {
        let left_format = self.column_format(left, left_column)?;
        let right_format = self.column_format(right, right_column)?;
        (left_format == right_format && left_format != ValueFormat::Text).then_some(left_format)
    }

    /// Format both columns share when they hold the same values in different
    /// notations (shared non-text format and normalized overlap above 0.5).
    pub fn detect_format_transformation(
        &self,
        left: &Dataset,
        left_column: usize,
        right: &Dataset,
        right_column: usize,
    ) -> Option<ValueFormat> {
        let format = self.shared_format(left, left_column, right, right_column)?;
        let overlap = self.normalized_match(left, left_column, right, right_column);
        is_transformation(overlap).then_some(format)
    }

    /// Compatibility of two columns' cardinality.
    pub fn cardinality_match(&self, left: &ColumnProfile, right: &ColumnProfile) -> f64 {
        match (left.is_primary_key, right.is_primary_key) {
            (true, true) => 0.9,
            (true, false) | (false, true) => 0.2,
            (false, false) => {
                let difference = (left.uniqueness - right.uniqueness).abs();
                if difference < 0.1 {
                    0.8
                } else if difference < 0.3 {
                    0.6
                } else {
                    0.3
                }
            }
        }
    }

    /// Human-readable rationale for a match.
    pub fn explain_match(&self, evidence: &MatchEvidence<'_>) -> String {
        let mut clauses = Vec::new();

        if evidence.name_similarity > 0.7 {
            clauses.push("column names are very similar".to_string());
        } else if evidence.name_similarity > 0.4 {
            clauses.push("column names are somewhat similar".to_string());
        }

        if let Some(format) = evidence.transformation {
            clauses.push(format!("same {format} data in different formats"));
        }

        if evidence.normalized_similarity > 0.7 {
            clauses.push("high value overlap when normalized".to_string());
        } else if evidence.normalized_similarity > 0.4 {
            clauses.push("moderate value overlap".to_string());
        }

        if evidence.left_profile.is_primary_key && evidence.right_profile.is_primary_key {
            clauses.push("both are unique identifiers".to_string());
        } else if evidence.cardinality_similarity > 0.7 {
            clauses.push("similar cardinality patterns".to_string());
        }

        if evidence.left_profile.quality_score > 0.7 && evidence.right_profile.quality_score > 0.7 {
            clauses.push("both have high data quality".to_string());
        }

        if clauses.is_empty() {
            return "weak match based on basic similarity".to_string();
        }
        clauses.join(", ")
    }
}

pub(crate) fn is_transformation(normalized_overlap: f64) -> bool {
    normalized_overlap > TRANSFORM_MIN_OVERLAP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, values: &[&str]) -> Dataset {
        Dataset::new(
            vec![name.to_string()],
            values.iter().map(|v| vec![v.to_string()]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_normalized_match_across_formats() {
        let matcher = NormalizedValueMatcher::new();
        let iso = column("d", &["2024-01-15", "2024-02-20", "2024-03-05"]);
        let us = column("d", &["01/15/2024", "02/20/2024", "03/05/2024"]);
        assert_eq!(matcher.normalized_match(&iso, 0, &us, 0), 1.0);
        assert_eq!(
            matcher.detect_format_transformation(&iso, 0, &us, 0),
            Some(ValueFormat::Date)
        );
    }

    #[test]
    fn test_normalized_match_samples_shorter_length() {
        let matcher = NormalizedValueMatcher::new();
        let long = column("x", &["a", "b", "c", "d"]);
        let short = column("x", &["a", "b"]);
        // Only the first two rows of each side are compared.
        assert_eq!(matcher.normalized_match(&long, 0, &short, 0), 1.0);
    }

    #[test]
    fn test_normalized_match_empty() {
        let matcher = NormalizedValueMatcher::new();
        let empty = column("x", &["", ""]);
        let full = column("x", &["a", "b"]);
        assert_eq!(matcher.normalized_match(&empty, 0, &full, 0), 0.0);
    }

    #[test]
    fn test_column_format_skips_leading_text() {
        let matcher = NormalizedValueMatcher::new();
        let dataset = column("x", &["", "n/a", "555-123-4567"]);
        assert_eq!(matcher.column_format(&dataset, 0), Some(ValueFormat::Phone));
        let text = column("x", &["alpha", "beta"]);
        assert_eq!(matcher.column_format(&text, 0), Some(ValueFormat::Text));
        assert_eq!(matcher.column_format(&column("x", &[""]), 0), None);
    }

    #[test]
    fn test_no_transformation_without_overlap() {
        let matcher = NormalizedValueMatcher::new();
        let left = column("d", &["2024-01-15", "2024-02-20"]);
        let right = column("d", &["05/05/2023", "06/06/2023"]);
        assert_eq!(matcher.shared_format(&left, 0, &right, 0), Some(ValueFormat::Date));
        assert_eq!(matcher.detect_format_transformation(&left, 0, &right, 0), None);
    }

    #[test]
    fn test_cardinality_match() {
        let matcher = NormalizedValueMatcher::new();
        let key = ColumnProfile {
            is_primary_key: true,
            uniqueness: 1.0,
            ..ColumnProfile::default()
        };
        let category = |uniqueness| ColumnProfile {
            uniqueness,
            ..ColumnProfile::default()
        };
        assert_eq!(matcher.cardinality_match(&key, &key), 0.9);
        assert_eq!(matcher.cardinality_match(&key, &category(0.5)), 0.2);
        assert_eq!(matcher.cardinality_match(&category(0.5), &category(0.55)), 0.8);
        assert_eq!(matcher.cardinality_match(&category(0.5), &category(0.7)), 0.6);
        assert_eq!(matcher.cardinality_match(&category(0.1), &category(0.9)), 0.3);
    }

    #[test]
    fn test_explain_match() {
        let matcher = NormalizedValueMatcher::new();
        let key = ColumnProfile {
            is_primary_key: true,
            quality_score: 0.9,
            ..ColumnProfile::default()
        };
        let evidence = MatchEvidence {
            name_similarity: 0.8,
            normalized_similarity: 1.0,
            cardinality_similarity: 0.9,
            left_profile: &key,
            right_profile: &key,
            transformation: Some(ValueFormat::Date),
        };
        assert_eq!(
            matcher.explain_match(&evidence),
            "column names are very similar, same date data in different formats, \
             high value overlap when normalized, both are unique identifiers, \
             both have high data quality"
        );

        let plain = ColumnProfile::default();
        let weak = MatchEvidence {
            name_similarity: 0.1,
            normalized_similarity: 0.0,
            cardinality_similarity: 0.3,
            left_profile: &plain,
            right_profile: &plain,
            transformation: None,
        };
        assert_eq!(matcher.explain_match(&weak), "weak match based on basic similarity");
    }
}
