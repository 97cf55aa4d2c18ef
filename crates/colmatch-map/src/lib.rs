//! Column matching between independently produced datasets.
//!
//! The pipeline profiles every column, compares names, value patterns and
//! normalized values, and combines them into a confidence score with the
//! weights and calibration maintained by `colmatch-learn`.
//!
//! Leaf components can be used on their own:
//! - [`FormatNormalizer`]: value classification and canonical forms
//! - [`DataQualityProfiler`]: per-column statistics
//! - [`NormalizedValueMatcher`]: normalized overlap, format transforms, cardinality
//!
//! [`EnhancedSimilarityService`] runs the whole pipeline over the column
//! cross product.

mod engine;
mod format;
mod normalized;
mod patterns;
mod quality;
mod synonyms;
mod utils;

pub use engine::{
    CUSTOM_MAPPING_CONFIDENCE, DEFAULT_MIN_CONFIDENCE, EnhancedSimilarityService, MatchOptions,
    best_matches, distribution_similarity_of, is_numeric_column,
};
pub use format::{FormatNormalizer, ValueFormat};
pub use normalized::{
    FORMAT_SAMPLE_ROWS, MatchEvidence, NORMALIZED_SAMPLE_ROWS, NormalizedValueMatcher,
};
pub use patterns::{PATTERN_DOMINANCE, PATTERN_SAMPLE_ROWS, ValuePattern, detect_pattern};
pub use quality::{DataQualityProfiler, NULL_SENTINELS, is_null};
pub use synonyms::{SYNONYMS, TokenSimilarity, synonyms_of, token_similarity};
pub use utils::{is_plain_number, levenshtein_ratio, normalize_name};
