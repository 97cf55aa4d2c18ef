//! Column-name synonym table and synonym-aware token similarity.

use std::collections::BTreeSet;

use colmatch_learn::tokenize_column;

use crate::utils::{jaccard, levenshtein_ratio, normalize_name};

/// Known column-name token synonyms, grouped by topic.
///
/// Lookups are directional: `price` lists `amount`, and `amount` lists
/// `price` separately.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    // Money
    ("price", &["cost", "amount", "value", "fee", "charge", "rate", "total"]),
    ("cost", &["price", "amount", "value", "fee", "charge", "expense"]),
    ("amount", &["price", "cost", "value", "total", "sum", "quantity"]),
    ("revenue", &["income", "sales", "earnings", "profit"]),
    // Identity
    ("id", &["identifier", "key", "code", "number", "num", "no"]),
    ("identifier", &["id", "key", "code", "number"]),
    ("code", &["id", "identifier", "key", "number"]),
    ("number", &["id", "num", "no", "code"]),
    // Person
    ("name", &["fullname", "title", "label", "description"]),
    ("firstname", &["first", "fname", "givenname", "given"]),
    ("lastname", &["last", "lname", "surname", "family"]),
    ("email", &["mail", "emailaddress", "emailid"]),
    ("phone", &["mobile", "cell", "telephone", "tel", "contact"]),
    // Address
    ("address", &["location", "addr", "street"]),
    ("city", &["town", "municipality", "place"]),
    ("state", &["province", "region", "territory"]),
    ("country", &["nation", "countrycode"]),
    ("zip", &["zipcode", "postal", "postalcode", "pincode"]),
    // Date and time
    ("date", &["datetime", "timestamp", "time", "dt"]),
    ("created", &["createdat", "createddate", "creationdate"]),
    ("updated", &["updatedat", "updateddate", "modifieddate", "modified"]),
    ("startdate", &["start", "begin", "from", "fromdate"]),
    ("enddate", &["end", "finish", "to", "todate"]),
    // Status
    ("status", &["state", "condition", "flag", "active", "enabled"]),
    ("type", &["category", "kind", "class", "classification"]),
    // Quantity
    ("quantity", &["qty", "count", "num", "amount", "units"]),
    ("count", &["quantity", "qty", "total", "num"]),
    // Description
    ("description", &["desc", "details", "info", "notes", "comment", "remarks"]),
    ("notes", &["description", "comments", "remarks", "memo"]),
];

/// Synonyms listed for `token`, empty when the token is unknown.
pub fn synonyms_of(token: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == token)
        .map_or(&[], |(_, synonyms)| *synonyms)
}

/// Name similarity of two column names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenSimilarity {
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Whether a synonym pair contributed to the token overlap.
    pub synonym: bool,
}

/// Compare two column names by normalized equality, synonym-expanded token
/// overlap and Levenshtein ratio.
///
/// Each token of either name is paired at most once: direct matches first,
/// then synonyms of the remaining left tokens.
pub fn token_similarity(left: &str, right: &str) -> TokenSimilarity {
    let normalized = normalize_name(left);
    if !normalized.is_empty() && normalized == normalize_name(right) {
        return TokenSimilarity {
            score: 1.0,
            synonym: false,
        };
    }

    let left_tokens: BTreeSet<String> = tokenize_column(left).into_iter().collect();
    let right_tokens: BTreeSet<String> = tokenize_column(right).into_iter().collect();
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return TokenSimilarity {
            score: 0.0,
            synonym: false,
        };
    }

    let mut unmatched_right: BTreeSet<&str> = right_tokens.iter().map(String::as_str).collect();
    let mut unmatched_left = Vec::new();
    let mut intersection = 0;
    for token in &left_tokens {
        if unmatched_right.remove(token.as_str()) {
            intersection += 1;
        } else {
            unmatched_left.push(token.as_str());
        }
    }

    let mut synonym = false;
    for token in unmatched_left {
        if let Some(found) = synonyms_of(token)
            .iter()
            .find(|candidate| unmatched_right.contains(*candidate))
        {
            unmatched_right.remove(*found);
            intersection += 1;
            synonym = true;
        }
    }

    let overlap = jaccard(intersection, left_tokens.len(), right_tokens.len());
    TokenSimilarity {
        score: overlap.max(levenshtein_ratio(left, right)),
        synonym,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms_of() {
        assert!(synonyms_of("id").contains(&"identifier"));
        assert!(synonyms_of("unknown").is_empty());
    }

    #[test]
    fn test_exact_normalized_match() {
        let sim = token_similarity("Customer_ID", "customer id");
        assert_eq!(sim.score, 1.0);
        assert!(!sim.synonym);
    }

    #[test]
    fn test_synonym_contributes() {
        let sim = token_similarity("user_id", "user_identifier");
        assert!(sim.synonym);
        assert!((sim.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_never_exceeds_one() {
        // `amount` matches directly and `price` would reach `total` as a synonym
        let sim = token_similarity("amount", "total_amount");
        assert!(sim.score <= 1.0);
        let sim = token_similarity("price_cost", "amount");
        assert!(sim.score <= 1.0, "{sim:?}");
        assert!(sim.synonym);
    }

    #[test]
    fn test_single_char_names() {
        let sim = token_similarity("a", "b");
        assert_eq!(sim.score, 0.0);
        assert!(!sim.synonym);
    }

    #[test]
    fn test_levenshtein_fallback() {
        let sim = token_similarity("order_date", "order_dt");
        // tokens {order, date} vs {order, dt}: date lists dt as a synonym
        assert!(sim.synonym);
        assert_eq!(sim.score, 1.0);
    }
}
