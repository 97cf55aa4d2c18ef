//! Value format detection and canonicalization.
//!
//! Values that denote the same thing in different notations (for example
//! `2024-01-15` and `01/15/2024`) normalize to one canonical string, so two
//! columns can be compared on content instead of presentation.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date layouts tried in order. Ambiguous `dd/mm` vs `mm/dd` values resolve
/// to the US reading.
const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%B %d, %Y",
];

const SQL_DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

const PHONE_SEPARATORS: &[char] = &['-', '(', ')', '+', '.'];
const NUMBER_DECORATIONS: &[char] = &['$', '€', '£', '¥', '₹', ','];

/// Phone numbers have between 10 and 15 digits once separators are removed.
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;

/// Kind of value detected by [`FormatNormalizer::detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Date,
    Phone,
    Number,
    Name,
    Text,
}

impl ValueFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Name => "name",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies single values and rewrites them into a canonical form.
///
/// Classification order is fixed: date, phone, number, name, text. The first
/// class that accepts a value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatNormalizer;

impl FormatNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Detect the format class of `value`.
    pub fn detect_format(&self, value: &str) -> ValueFormat {
        self.classify(value).0
    }

    /// Canonical form of `value`.
    ///
    /// Dates become `YYYY-MM-DD`, phones their digit string, numbers the
    /// shortest decimal rendering, names `first last` in lowercase and
    /// anything else lowercase. Empty input stays empty.
    pub fn normalize_value(&self, value: &str) -> String {
        self.classify(value).1
    }

    fn classify(&self, value: &str) -> (ValueFormat, String) {
        let value = value.trim();
        if value.is_empty() {
            return (ValueFormat::Text, String::new());
        }
        if let Some(date) = parse_date(value) {
            return (ValueFormat::Date, date.format("%Y-%m-%d").to_string());
        }
        if let Some(digits) = phone_digits(value) {
            return (ValueFormat::Phone, digits);
        }
        if let Some(number) = parse_number(value) {
            return (ValueFormat::Number, number.to_string());
        }
        if let Some(name) = normalize_person_name(value) {
            // Only whitespace marks a name; `Smith,John` still normalizes as one.
            let format = if value.contains(char::is_whitespace) {
                ValueFormat::Name
            } else {
                ValueFormat::Text
            };
            return (format, name);
        }
        (ValueFormat::Text, value.to_lowercase())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, SQL_DATETIME_LAYOUT)
                .ok()
                .map(|dt| dt.date())
        })
}

fn phone_digits(value: &str) -> Option<String> {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !PHONE_SEPARATORS.contains(c))
        .collect();
    (PHONE_DIGITS.contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()))
        .then_some(digits)
}

fn parse_number(value: &str) -> Option<f64> {
    let stripped: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !NUMBER_DECORATIONS.contains(c))
        .collect();
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Lowercased name with collapsed whitespace; `Last, First` is reordered.
fn normalize_person_name(value: &str) -> Option<String> {
    let has_letter = value.chars().any(char::is_alphabetic);
    let has_separator = value.chars().any(|c| c.is_whitespace() || c == ',');
    if !has_letter || !has_separator {
        return None;
    }

    let collapse = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    let parts: Vec<&str> = value.split(',').collect();
    let name = match parts.as_slice() {
        [last, first] => collapse(&format!("{} {}", first.trim(), last.trim())),
        _ => collapse(value),
    };
    Some(name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates_normalize_to_iso() {
        let normalizer = FormatNormalizer::new();
        for value in [
            "2024-01-15",
            "01/15/2024",
            "15/01/2024",
            "2024/01/15",
            "15-Jan-2024",
            "January 15, 2024",
            "2024-01-15T10:30:00Z",
            "2024-01-15 10:30:00",
        ] {
            assert_eq!(normalizer.detect_format(value), ValueFormat::Date, "{value}");
            assert_eq!(normalizer.normalize_value(value), "2024-01-15", "{value}");
        }
    }

    #[test]
    fn test_ambiguous_date_reads_as_us() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.normalize_value("02/03/2024"), "2024-02-03");
    }

    #[test]
    fn test_phone() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.detect_format("(555) 123-4567"), ValueFormat::Phone);
        assert_eq!(normalizer.normalize_value("+1 (555) 123-4567"), "15551234567");
        assert_eq!(normalizer.normalize_value("555.123.4567"), "5551234567");
    }

    #[test]
    fn test_numbers() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.detect_format("$1,234.50"), ValueFormat::Number);
        assert_eq!(normalizer.normalize_value("$1,234.50"), "1234.5");
        assert_eq!(normalizer.normalize_value("42"), "42");
        assert_eq!(normalizer.normalize_value("€ 7.00"), "7");
        assert_eq!(normalizer.detect_format("inf"), ValueFormat::Text);
    }

    #[test]
    fn test_names() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.detect_format("Smith, John"), ValueFormat::Name);
        assert_eq!(normalizer.normalize_value("Smith, John"), "john smith");
        assert_eq!(normalizer.normalize_value("John   Smith"), "john smith");
        assert_eq!(normalizer.normalize_value("a, b, c"), "a, b, c");
    }

    #[test]
    fn test_comma_without_space_is_text() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.detect_format("Smith,John"), ValueFormat::Text);
        assert_eq!(normalizer.detect_format("red,green"), ValueFormat::Text);
        assert_eq!(normalizer.normalize_value("Smith,John"), "john smith");
        assert_eq!(normalizer.detect_format("John Smith"), ValueFormat::Name);
    }

    #[test]
    fn test_text_fallback() {
        let normalizer = FormatNormalizer::new();
        assert_eq!(normalizer.detect_format("Widget"), ValueFormat::Text);
        assert_eq!(normalizer.normalize_value("  Widget "), "widget");
        assert_eq!(normalizer.normalize_value(""), "");
        assert_eq!(normalizer.normalize_value("   "), "");
    }
}
