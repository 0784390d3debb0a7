//! Token-order-insensitive string similarity.

fn sorted_tokens(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two names on a 0-100 scale, ignoring case, punctuation and
/// word order: normalized Levenshtein over the sorted tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u8
}
