//! Per-column statistical profiling.

use std::collections::BTreeMap;

use colmatch_model::{ColumnProfile, Dataset};

/// Cell values treated as missing, in addition to absent cells.
pub const NULL_SENTINELS: &[&str] = &["", "null", "NULL", "None"];

const PRIMARY_KEY_MIN_UNIQUENESS: f64 = 0.95;
const PRIMARY_KEY_MAX_NULL_RATE: f64 = 0.05;
/// Entropy (bits) considered typical of a useful column.
const IDEAL_ENTROPY: f64 = 4.0;
const LOW_QUALITY: f64 = 0.3;

/// Computes [`ColumnProfile`]s and compares them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataQualityProfiler;

impl DataQualityProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Profile one column. Out-of-range columns profile as fully null.
    pub fn profile_column(&self, dataset: &Dataset, column: usize) -> ColumnProfile {
        let column_name = dataset
            .headers()
            .get(column)
            .cloned()
            .unwrap_or_default();
        let total_rows = dataset.row_count();

        let mut frequencies: BTreeMap<&str, usize> = BTreeMap::new();
        for value in dataset.column_values(column).flatten() {
            if !is_null(value) {
                *frequencies.entry(value).or_insert(0) += 1;
            }
        }

        let non_null_rows: usize = frequencies.values().sum();
        let distinct_count = frequencies.len();
        let null_rate = if total_rows == 0 {
            0.0
        } else {
            (total_rows - non_null_rows) as f64 / total_rows as f64
        };
        let uniqueness = if non_null_rows == 0 {
            0.0
        } else {
            distinct_count as f64 / non_null_rows as f64
        };
        let entropy = shannon_entropy(frequencies.values().copied(), non_null_rows);
        let is_primary_key =
            uniqueness > PRIMARY_KEY_MIN_UNIQUENESS && null_rate < PRIMARY_KEY_MAX_NULL_RATE;

        ColumnProfile {
            column_name,
            total_rows,
            non_null_rows,
            null_rate,
            distinct_count,
            uniqueness,
            entropy,
            is_primary_key,
            quality_score: quality_score(null_rate, entropy),
        }
    }

    /// Profile every column of a dataset, in header order.
    pub fn profile_all(&self, dataset: &Dataset) -> Vec<ColumnProfile> {
        (0..dataset.column_count())
            .map(|column| self.profile_column(dataset, column))
            .collect()
    }

    /// Structural similarity of two profiles, in `[0, 1]`.
    ///
    /// Returns a neutral 0.5 when either column is of low quality.
    pub fn compare_quality(&self, left: &ColumnProfile, right: &ColumnProfile) -> f64 {
        if left.quality_score < LOW_QUALITY || right.quality_score < LOW_QUALITY {
            return 0.5;
        }

        let uniqueness_similarity = 1.0 - (left.uniqueness - right.uniqueness).abs();
        let entropy_similarity = (1.0 - (left.entropy - right.entropy).abs() / 10.0).max(0.0);
        let both_keys = if left.is_primary_key && right.is_primary_key {
            0.3
        } else {
            0.0
        };

        (0.4 * uniqueness_similarity + 0.3 * entropy_similarity + both_keys + 0.3).clamp(0.0, 1.0)
    }
}

pub fn is_null(value: &str) -> bool {
    NULL_SENTINELS.contains(&value)
}

fn shannon_entropy(counts: impl Iterator<Item = usize>, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    counts
        .filter(|&count| count > 0)
        .map(|count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Completeness scaled by how close entropy is to the ideal.
fn quality_score(null_rate: f64, entropy: f64) -> f64 {
    let entropy_factor = (1.0 - (entropy - IDEAL_ENTROPY).abs() / 10.0).max(0.5);
    ((1.0 - null_rate) * entropy_factor).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(values: Vec<String>) -> Dataset {
        Dataset::new(
            vec!["col".to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_distinct_column_is_primary_key() {
        let dataset = single_column((0..100).map(|i| format!("v{i}")).collect());
        let profile = DataQualityProfiler::new().profile_column(&dataset, 0);

        assert_eq!(profile.total_rows, 100);
        assert_eq!(profile.non_null_rows, 100);
        assert_eq!(profile.distinct_count, 100);
        assert_eq!(profile.null_rate, 0.0);
        assert_eq!(profile.uniqueness, 1.0);
        assert!((profile.entropy - 100f64.log2()).abs() < 1e-9);
        assert!(profile.is_primary_key);
        let expected = 1.0 - (100f64.log2() - 4.0) / 10.0;
        assert!((profile.quality_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_nulls_and_absent_cells() {
        let dataset = Dataset::new(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec!["x".to_string(), "1".to_string()],
                vec!["NULL".to_string(), "2".to_string()],
                vec!["None".to_string()],
                vec!["x".to_string(), String::new()],
            ],
        )
        .unwrap();
        let profiler = DataQualityProfiler::new();

        let a = profiler.profile_column(&dataset, 0);
        assert_eq!(a.non_null_rows, 2);
        assert_eq!(a.distinct_count, 1);
        assert_eq!(a.null_rate, 0.5);
        assert_eq!(a.entropy, 0.0);
        assert!(!a.is_primary_key);

        let b = profiler.profile_column(&dataset, 1);
        assert_eq!(b.non_null_rows, 2);
        assert_eq!(b.null_rate, 0.5);
        assert_eq!(b.uniqueness, 1.0);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::new(vec!["a".to_string()], Vec::new()).unwrap();
        let profile = DataQualityProfiler::new().profile_column(&dataset, 0);
        assert_eq!(profile.total_rows, 0);
        assert_eq!(profile.uniqueness, 0.0);
        assert_eq!(profile.entropy, 0.0);
        assert!(!profile.is_primary_key);
    }

    #[test]
    fn test_profile_all() {
        let dataset = Dataset::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string(), "2".to_string()]],
        )
        .unwrap();
        let profiles = DataQualityProfiler::new().profile_all(&dataset);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].column_name, "b");
    }

    #[test]
    fn test_compare_quality() {
        let profiler = DataQualityProfiler::new();
        let key = ColumnProfile {
            uniqueness: 1.0,
            entropy: 5.0,
            is_primary_key: true,
            quality_score: 0.9,
            ..ColumnProfile::default()
        };
        assert!((profiler.compare_quality(&key, &key) - 1.0).abs() < 1e-12);

        let poor = ColumnProfile {
            quality_score: 0.1,
            ..key.clone()
        };
        assert_eq!(profiler.compare_quality(&key, &poor), 0.5);

        let category = ColumnProfile {
            uniqueness: 0.1,
            entropy: 2.0,
            quality_score: 0.8,
            ..ColumnProfile::default()
        };
        // 0.4 * 0.1 + 0.3 * 0.7 + 0.3
        assert!((profiler.compare_quality(&key, &category) - 0.55).abs() < 1e-9);
    }
}
