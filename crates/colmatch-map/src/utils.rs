use rapidfuzz::distance::levenshtein;

/// Lowercase and strip `_`, `-` and spaces, so `Customer_ID` and
/// `customer id` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// `1 - distance / max_len` over the lowercased strings, 1.0 when both are empty.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein::distance(a.chars(), b.chars());
    1.0 - distance as f64 / max_len as f64
}

/// Plain decimal literal: optional leading `-`, digits, at most one `.`.
pub fn is_plain_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

/// Jaccard similarity of two sets given their sizes and intersection.
pub(crate) fn jaccard(intersection: usize, left: usize, right: usize) -> f64 {
    let union = left + right - intersection;
    if left == 0 || right == 0 || union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
