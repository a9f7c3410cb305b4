//! String similarity for post-filtering and ranking search results.
//!
//! A Levenshtein ratio bounded to [0,1]: `1.0` for identical strings
//! (after case folding), `0.0` for completely dissimilar ones. Symmetric
//! in its arguments, which is all the orchestrator requires.

/// Normalized Levenshtein similarity between two strings, in [0,1].
///
/// Comparison is case-insensitive. Two empty strings count as identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let distance = levenshtein(&a, &b);
    1.0 - distance as f64 / longest as f64
}

/// Classic two-row Levenshtein edit distance over char slices.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
