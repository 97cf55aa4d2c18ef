use serde::{Deserialize, Serialize};

/// Per-column statistics computed for one matching request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column_name: String,
    pub total_rows: usize,
    pub non_null_rows: usize,
    /// Fraction of rows that are null or absent (0.0 to 1.0).
    pub null_rate: f64,
    pub distinct_count: usize,
    /// Distinct values over non-null rows (0.0 to 1.0).
    pub uniqueness: f64,
    /// Shannon entropy of the value frequencies, in bits.
    pub entropy: f64,
    pub is_primary_key: bool,
    /// Overall quality estimate (0.0 to 1.0).
    pub quality_score: f64,
}
