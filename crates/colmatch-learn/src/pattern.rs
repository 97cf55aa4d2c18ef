//! Column-name pattern and token equivalence learning.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::load_snapshot;
use crate::sync::{read_or_recover, write_or_recover};
use crate::writer::{SnapshotTarget, SnapshotWriter};

/// Confidence given to a rule the first time it is confirmed.
const SEED_RULE_CONFIDENCE: f64 = 0.7;
/// Score given to a token pair the first time it is confirmed.
const SEED_TOKEN_SCORE: f64 = 0.6;
/// Multiplier applied to a token pair's score on rejection.
const TOKEN_PENALTY: f64 = 0.8;
/// Lowest score a rejected token pair can decay to.
const TOKEN_SCORE_FLOOR: f64 = 0.1;

/// Suffixes checked in order; the first hit wins.
const SUFFIX_PATTERNS: &[(&str, &str)] = &[
    ("_id", "*_id"),
    ("_identifier", "*_identifier"),
    ("_code", "*_code"),
    ("_name", "*_name"),
    ("_date", "*_date"),
    ("_time", "*_time"),
    ("_at", "*_at"),
    ("_type", "*_type"),
    ("_status", "*_status"),
    ("_amount", "*_amount"),
    ("_price", "*_price"),
    ("_count", "*_count"),
    ("_num", "*_num"),
    ("_number", "*_number"),
];

/// Prefixes checked in order after the suffixes.
const PREFIX_PATTERNS: &[(&str, &str)] = &[
    ("is_", "is_*"),
    ("has_", "has_*"),
    ("date_", "date_*"),
    ("num_", "num_*"),
];

/// A learned correspondence between two column-name patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern1: String,
    pub pattern2: String,
    pub confidence: f64,
    pub success_count: u32,
    pub fail_count: u32,
    pub last_updated: DateTime<Utc>,
}

/// A learned equivalence between a left-name token and a right-name token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMapping {
    pub token1: String,
    pub token2: String,
    pub score: f64,
    pub occurrences: u32,
}

/// Persisted pattern learner state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternState {
    pub patterns: Vec<PatternRule>,
    /// Keyed by `"token1|token2"`.
    pub token_mappings: BTreeMap<String, TokenMapping>,
}

impl PatternState {
    fn rule_mut(&mut self, pattern1: &str, pattern2: &str) -> Option<&mut PatternRule> {
        self.patterns
            .iter_mut()
            .find(|r| r.pattern1 == pattern1 && r.pattern2 == pattern2)
    }

    fn rule(&self, pattern1: &str, pattern2: &str) -> Option<&PatternRule> {
        self.patterns
            .iter()
            .find(|r| r.pattern1 == pattern1 && r.pattern2 == pattern2)
    }
}

/// Generalize a column name to a `*_suffix` or `prefix*` pattern.
///
/// Returns an empty string when no known suffix or prefix applies.
pub fn extract_pattern(name: &str) -> String {
    let lower = name.to_lowercase();

    if let Some((_, pattern)) = SUFFIX_PATTERNS
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
    {
        return (*pattern).to_string();
    }

    PREFIX_PATTERNS
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, pattern)| (*pattern).to_string())
        .unwrap_or_default()
}

/// Split a column name into lowercase tokens.
///
/// Splits on `_`, `-`, `.`, whitespace and lowercase-to-uppercase boundaries
/// (`customerId` -> `customer`, `id`). Single-character tokens are dropped.
pub fn tokenize_column(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            push_token(&mut tokens, &mut current);
            prev_lower = false;
            continue;
        }
        if prev_lower && c.is_uppercase() {
            push_token(&mut tokens, &mut current);
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    push_token(&mut tokens, &mut current);
    tokens
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    if current.chars().count() > 1 {
        tokens.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Smoothed success ratio `(s + 2) / (s + f + 4)`; 0.5 with no evidence.
pub fn pattern_confidence(success: u32, fail: u32) -> f64 {
    (f64::from(success) + 2.0) / (f64::from(success) + f64::from(fail) + 4.0)
}

fn token_key(left: &str, right: &str) -> String {
    format!("{left}|{right}")
}

/// Learns which column-name patterns and tokens correspond.
#[derive(Debug, Default)]
pub struct PatternLearner {
    state: RwLock<PatternState>,
    snapshot: Option<SnapshotTarget>,
}

impl PatternLearner {
    /// In-memory learner with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learner backed by the snapshot at `path`, loaded if present.
    pub fn open(path: impl Into<PathBuf>, writer: Arc<SnapshotWriter>) -> Self {
        let target = SnapshotTarget::new(writer, path);
        let state = load_snapshot(target.path(), "pattern learning").unwrap_or_default();
        Self {
            state: RwLock::new(state),
            snapshot: Some(target),
        }
    }

    pub fn patterns(&self) -> Vec<PatternRule> {
        read_or_recover(&self.state).patterns.clone()
    }

    pub fn token_mappings(&self) -> Vec<TokenMapping> {
        read_or_recover(&self.state)
            .token_mappings
            .values()
            .cloned()
            .collect()
    }

    /// Copy of the full learner state.
    pub fn state(&self) -> PatternState {
        read_or_recover(&self.state).clone()
    }

    /// Record a confirmed match between `left` and `right`.
    pub fn learn_from_positive(&self, left: &str, right: &str) {
        let pattern1 = extract_pattern(left);
        let pattern2 = extract_pattern(right);
        let tokens1 = tokenize_column(left);
        let tokens2 = tokenize_column(right);
        let now = Utc::now();

        let snapshot = {
            let mut state = write_or_recover(&self.state);

            if let Some(rule) = state.rule_mut(&pattern1, &pattern2) {
                rule.success_count += 1;
                rule.confidence = pattern_confidence(rule.success_count, rule.fail_count);
                rule.last_updated = now;
            } else if !pattern1.is_empty() && !pattern2.is_empty() {
                state.patterns.push(PatternRule {
                    pattern1: pattern1.clone(),
                    pattern2: pattern2.clone(),
                    confidence: SEED_RULE_CONFIDENCE,
                    success_count: 1,
                    fail_count: 0,
                    last_updated: now,
                });
            }

            for t1 in &tokens1 {
                for t2 in &tokens2 {
                    state
                        .token_mappings
                        .entry(token_key(t1, t2))
                        .and_modify(|mapping| {
                            mapping.occurrences += 1;
                            let occ = f64::from(mapping.occurrences);
                            mapping.score = 0.5 + 0.5 * occ / (occ + 5.0);
                        })
                        .or_insert_with(|| TokenMapping {
                            token1: t1.clone(),
                            token2: t2.clone(),
                            score: SEED_TOKEN_SCORE,
                            occurrences: 1,
                        });
                }
            }

            self.snapshot.as_ref().map(|_| state.clone())
        };

        tracing::info!(
            "Learned positive: {left} <-> {right} (pattern: {pattern1} <-> {pattern2})"
        );
        self.submit(snapshot);
    }

    /// Record a rejected match between `left` and `right`.
    pub fn learn_from_negative(&self, left: &str, right: &str, name_sim: f64, data_sim: f64) {
        let pattern1 = extract_pattern(left);
        let pattern2 = extract_pattern(right);
        let tokens1 = tokenize_column(left);
        let tokens2 = tokenize_column(right);
        let now = Utc::now();

        let snapshot = {
            let mut state = write_or_recover(&self.state);

            if let Some(rule) = state.rule_mut(&pattern1, &pattern2) {
                rule.fail_count += 1;
                rule.confidence = pattern_confidence(rule.success_count, rule.fail_count);
                rule.last_updated = now;
            }

            for t1 in &tokens1 {
                for t2 in &tokens2 {
                    if let Some(mapping) = state.token_mappings.get_mut(&token_key(t1, t2)) {
                        mapping.score = (mapping.score * TOKEN_PENALTY).max(TOKEN_SCORE_FLOOR);
                    }
                }
            }

            self.snapshot.as_ref().map(|_| state.clone())
        };

        tracing::info!(
            "Learned negative: {left} <-> {right} (name_sim={name_sim:.2}, data_sim={data_sim:.2})"
        );
        self.submit(snapshot);
    }

    /// Confidence adjustment for a candidate pair, roughly in [-0.2, 0.2].
    ///
    /// A decisive pattern rule (confidence above 0.7 or below 0.3) wins;
    /// otherwise the mean centred score of the known token pairs is used.
    pub fn pattern_boost(&self, left: &str, right: &str) -> f64 {
        let pattern1 = extract_pattern(left);
        let pattern2 = extract_pattern(right);
        let state = read_or_recover(&self.state);

        if let Some(rule) = state.rule(&pattern1, &pattern2)
            && (rule.confidence > 0.7 || rule.confidence < 0.3)
        {
            return (rule.confidence - 0.5) * 0.4;
        }

        let tokens1 = tokenize_column(left);
        let tokens2 = tokenize_column(right);
        let mut total = 0.0;
        let mut count = 0usize;
        for t1 in &tokens1 {
            for t2 in &tokens2 {
                if let Some(mapping) = state.token_mappings.get(&token_key(t1, t2)) {
                    total += mapping.score - 0.5;
                    count += 1;
                }
            }
        }

        if count > 0 {
            total / count as f64 * 0.2
        } else {
            0.0
        }
    }

    fn submit(&self, snapshot: Option<PatternState>) {
        if let (Some(target), Some(snapshot)) = (&self.snapshot, snapshot) {
            target.submit(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_pattern_examples() {
        assert_eq!(extract_pattern("customer_id"), "*_id");
        assert_eq!(extract_pattern("Order_Date"), "*_date");
        assert_eq!(extract_pattern("is_active"), "is_*");
        assert_eq!(extract_pattern("created_at"), "*_at");
        assert_eq!(extract_pattern("num_items"), "num_*");
        assert_eq!(extract_pattern("amount"), "");
    }

    #[test]
    fn test_extract_pattern_prefers_suffix() {
        // "date_" prefix loses to the "_id" suffix.
        assert_eq!(extract_pattern("date_id"), "*_id");
    }

    #[test]
    fn test_tokenize_column() {
        assert_eq!(tokenize_column("customer_id"), vec!["customer", "id"]);
        assert_eq!(tokenize_column("customerId"), vec!["customer", "id"]);
        assert_eq!(tokenize_column("order.total-amt x"), vec!["order", "total", "amt"]);
        assert_eq!(tokenize_column("ID"), vec!["id"]);
        assert!(tokenize_column("a_b").is_empty());
    }

    #[test]
    fn test_pattern_confidence_smoothing() {
        assert_eq!(pattern_confidence(0, 0), 0.5);
        assert!((pattern_confidence(2, 0) - 4.0 / 6.0).abs() < 1e-12);
        assert!(pattern_confidence(3, 0) > pattern_confidence(2, 0));
        assert!(pattern_confidence(2, 1) < pattern_confidence(2, 0));
    }

    #[test]
    fn test_positive_creates_rule_and_tokens() {
        let learner = PatternLearner::new();
        learner.learn_from_positive("customer_id", "client_id");

        let patterns = learner.patterns();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern1, "*_id");
        assert_eq!(patterns[0].confidence, 0.7);
        assert_eq!(learner.token_mappings().len(), 4);

        learner.learn_from_positive("customer_id", "client_id");
        let patterns = learner.patterns();
        assert_eq!(patterns[0].success_count, 2);
        assert!((patterns[0].confidence - 4.0 / 6.0).abs() < 1e-12);

        let state = learner.state();
        let mapping = &state.token_mappings["customer|client"];
        assert_eq!(mapping.occurrences, 2);
        assert!((mapping.score - (0.5 + 0.5 * 2.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_positive_without_patterns_adds_no_rule() {
        let learner = PatternLearner::new();
        learner.learn_from_positive("amount", "total_amt");
        assert!(learner.patterns().is_empty());
        assert_eq!(learner.token_mappings().len(), 2);
    }

    #[test]
    fn test_negative_decays_tokens() {
        let learner = PatternLearner::new();
        learner.learn_from_positive("user_name", "full_name");
        learner.learn_from_negative("user_name", "full_name", 0.4, 0.1);

        let state = learner.state();
        assert_eq!(state.patterns[0].fail_count, 1);
        assert!((state.token_mappings["user|full"].score - 0.48).abs() < 1e-12);

        for _ in 0..50 {
            learner.learn_from_negative("user_name", "full_name", 0.4, 0.1);
        }
        let state = learner.state();
        assert_eq!(state.token_mappings["user|full"].score, TOKEN_SCORE_FLOOR);
    }

    #[test]
    fn test_pattern_boost() {
        let learner = PatternLearner::new();
        assert_eq!(learner.pattern_boost("customer_id", "client_id"), 0.0);

        // Seed rule at 0.7 is not decisive; token pairs decide.
        learner.learn_from_positive("customer_id", "client_id");
        let boost = learner.pattern_boost("customer_id", "client_id");
        assert!((boost - 0.1 * 0.2).abs() < 1e-12);

        // Two more confirmations: (3+2)/(3+4) > 0.7 makes the rule decisive.
        learner.learn_from_positive("customer_id", "client_id");
        learner.learn_from_positive("customer_id", "client_id");
        let confidence = 5.0 / 7.0;
        let boost = learner.pattern_boost("order_id", "sku_id");
        assert!((boost - (confidence - 0.5) * 0.4).abs() < 1e-12);
    }
}
