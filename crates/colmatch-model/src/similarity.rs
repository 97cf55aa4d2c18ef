//! Column-pair match results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The dominant evidence behind a match, chosen by a fixed precedence chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Pattern,
    ValueOverlap,
    Distribution,
    Synonym,
    Token,
    Name,
    Weak,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::ValueOverlap => "value_overlap",
            Self::Distribution => "distribution",
            Self::Synonym => "synonym",
            Self::Token => "token",
            Self::Name => "name",
            Self::Weak => "weak",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One boost, multiplier or override applied while scoring a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    /// Short adjustment name (e.g., "Synonym").
    pub name: String,
    /// Confidence before the adjustment (0.0 to 100.0).
    pub before: f64,
    /// Confidence after the adjustment.
    pub after: f64,
    /// Human-readable description.
    pub description: String,
}

impl ScoreAdjustment {
    /// Signed change in confidence points.
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Full scoring breakdown for one (left, right) column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub left_column: String,
    pub right_column: String,
    /// Confidence divided by 100.
    pub similarity: f64,
    /// Final confidence (0.0 to 100.0).
    pub confidence: f64,
    pub match_type: MatchType,
    pub data_similarity: f64,
    pub name_similarity: f64,
    pub distribution_similarity: f64,
    pub pattern_similarity: f64,
    pub llm_similarity: f64,
    pub token_similarity: f64,
    pub synonym_match: bool,
    /// Shared value pattern, or `{format}_transform` when the columns hold
    /// the same kind of value in different notations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_match: Option<String>,
    pub value_overlap: f64,
    pub rationale: String,
    #[serde(default)]
    pub adjustments: Vec<ScoreAdjustment>,
}

impl SimilarityResult {
    /// Human-readable list of the adjustments applied.
    pub fn explain_adjustments(&self) -> String {
        self.adjustments
            .iter()
            .map(|a| format!("{}: {:+.1}", a.name, a.delta()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_serializes_snake_case() {
        let json = serde_json::to_string(&MatchType::ValueOverlap).expect("serialize");
        assert_eq!(json, "\"value_overlap\"");
        assert_eq!(MatchType::Weak.to_string(), "weak");
    }

    #[test]
    fn explains_adjustments() {
        let result = SimilarityResult {
            left_column: "amount".to_string(),
            right_column: "total_amt".to_string(),
            similarity: 0.6,
            confidence: 60.0,
            match_type: MatchType::Synonym,
            data_similarity: 0.0,
            name_similarity: 0.5,
            distribution_similarity: 0.0,
            pattern_similarity: 0.0,
            llm_similarity: 0.0,
            token_similarity: 0.5,
            synonym_match: true,
            pattern_match: None,
            value_overlap: 0.0,
            rationale: String::new(),
            adjustments: vec![ScoreAdjustment {
                name: "Synonym".to_string(),
                before: 50.0,
                after: 60.0,
                description: "synonym tokens matched".to_string(),
            }],
        };
        assert_eq!(result.explain_adjustments(), "Synonym: +10.0");
    }
}
