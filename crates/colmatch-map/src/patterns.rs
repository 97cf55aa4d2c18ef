//! Value format library used for the pattern signal.
//!
//! Patterns are tried in a fixed order and a value counts only for the first
//! pattern it matches, so `12345` is a zipcode and never a currency amount.

use std::fmt;
use std::sync::LazyLock;

use colmatch_model::Dataset;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Rows sampled from the top of a column.
pub const PATTERN_SAMPLE_ROWS: usize = 50;

/// Share of sampled rows the dominant pattern must match.
pub const PATTERN_DOMINANCE: f64 = 0.6;

/// A recognizable value format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePattern {
    Email,
    Uuid,
    DateIso,
    DateUs,
    Ip,
    Url,
    Zipcode,
    Currency,
    Phone,
}

impl ValuePattern {
    /// Every pattern in match order.
    pub const ALL: [Self; 9] = [
        Self::Email,
        Self::Uuid,
        Self::DateIso,
        Self::DateUs,
        Self::Ip,
        Self::Url,
        Self::Zipcode,
        Self::Currency,
        Self::Phone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::DateIso => "date_iso",
            Self::DateUs => "date_us",
            Self::Ip => "ip",
            Self::Url => "url",
            Self::Zipcode => "zipcode",
            Self::Currency => "currency",
            Self::Phone => "phone",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Self::Email => &EMAIL_REGEX,
            Self::Uuid => &UUID_REGEX,
            Self::DateIso => &DATE_ISO_REGEX,
            Self::DateUs => &DATE_US_REGEX,
            Self::Ip => &IP_REGEX,
            Self::Url => &URL_REGEX,
            Self::Zipcode => &ZIPCODE_REGEX,
            Self::Currency => &CURRENCY_REGEX,
            Self::Phone => &PHONE_REGEX,
        }
    }

    pub fn matches(self, value: &str) -> bool {
        self.regex().is_match(value)
    }

    /// First pattern in match order that accepts `value`.
    pub fn classify(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pattern| pattern.matches(value))
    }
}

impl fmt::Display for ValuePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
});

static UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("Invalid UUID regex")
});

static DATE_ISO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid ISO date regex"));

static DATE_US_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("Invalid US date regex"));

static IP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("Invalid IP regex")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("Invalid URL regex"));

static ZIPCODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("Invalid zipcode regex"));

static CURRENCY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[$€£¥₹]?\s*\d+([,.]\d{2})?$").expect("Invalid currency regex")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?\(?[0-9]{1,4}\)?[-\s./0-9]*$").expect("Invalid phone regex")
});

/// Dominant value pattern of a column.
///
/// Samples the first [`PATTERN_SAMPLE_ROWS`] rows. Empty and absent cells
/// count toward the sample size but never match, so sparse columns rarely
/// reach the dominance threshold.
pub fn detect_pattern(dataset: &Dataset, column: usize) -> Option<ValuePattern> {
    let sample = dataset.row_count().min(PATTERN_SAMPLE_ROWS);
    if sample == 0 {
        return None;
    }

    let mut counts = [0usize; ValuePattern::ALL.len()];
    for value in dataset.column_values(column).take(sample).flatten() {
        if value.is_empty() {
            continue;
        }
        if let Some(index) = ValuePattern::ALL
            .iter()
            .position(|pattern| pattern.matches(value))
        {
            counts[index] += 1;
        }
    }

    let threshold = sample as f64 * PATTERN_DOMINANCE;
    ValuePattern::ALL
        .into_iter()
        .zip(counts)
        .find(|&(_, count)| count > 0 && count as f64 >= threshold)
        .map(|(pattern, _)| pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[&str]) -> Dataset {
        Dataset::new(
            vec!["col".to_string()],
            values.iter().map(|v| vec![v.to_string()]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_classify_order() {
        assert_eq!(ValuePattern::classify("a@b.io"), Some(ValuePattern::Email));
        assert_eq!(
            ValuePattern::classify("123e4567-e89b-12d3-a456-426614174000"),
            Some(ValuePattern::Uuid)
        );
        assert_eq!(ValuePattern::classify("2024-01-15"), Some(ValuePattern::DateIso));
        assert_eq!(ValuePattern::classify("01/15/2024"), Some(ValuePattern::DateUs));
        assert_eq!(ValuePattern::classify("10.0.0.1"), Some(ValuePattern::Ip));
        assert_eq!(ValuePattern::classify("https://x.org"), Some(ValuePattern::Url));
        assert_eq!(ValuePattern::classify("12345"), Some(ValuePattern::Zipcode));
        assert_eq!(ValuePattern::classify("$19.99"), Some(ValuePattern::Currency));
        assert_eq!(ValuePattern::classify("(555) 123-4567"), Some(ValuePattern::Phone));
        assert_eq!(ValuePattern::classify("hello"), None);
    }

    #[test]
    fn test_detect_dominant_pattern() {
        let dataset = column(&["a@b.io", "c@d.io", "e@f.io", "nope", ""]);
        assert_eq!(detect_pattern(&dataset, 0), Some(ValuePattern::Email));
    }

    #[test]
    fn test_detect_below_threshold() {
        let dataset = column(&["a@b.io", "c@d.io", "x", "y", "z"]);
        assert_eq!(detect_pattern(&dataset, 0), None);
    }

    #[test]
    fn test_detect_empty_column() {
        let dataset = column(&["", "", ""]);
        assert_eq!(detect_pattern(&dataset, 0), None);
        let empty = Dataset::new(vec!["col".to_string()], Vec::new()).unwrap();
        assert_eq!(detect_pattern(&empty, 0), None);
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!(ValuePattern::DateIso.to_string(), "date_iso");
        assert_eq!(
            serde_json::to_string(&ValuePattern::Zipcode).unwrap(),
            "\"zipcode\""
        );
    }
}
