//! Tag matching helpers.

/// Returns true when two tags match fuzzily: either side contains the
/// other as a substring.
///
/// Note that fuzzy matching is deliberately loose: `"doc-1"` matches
/// `"doc-10"` as well as `"doc-1"`. Callers that need precision should
/// compare tags exactly instead.
pub fn fuzzy_matches(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}
