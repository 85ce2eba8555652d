/// Normalized similarity of two texts in [0, 1].
///
/// Computed as a longest-common-subsequence ratio over whitespace tokens:
/// `2 * lcs / (len_a + len_b)`. Symmetric, and 1.0 for identical inputs.
/// Token alignment rather than equality matters here: model rewrites rarely
/// reproduce text byte-for-byte even when nothing meaningful changed.
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&tokens_a, &tokens_b);
    (2.0 * lcs as f64) / (tokens_a.len() + tokens_b.len()) as f64
}

/// Longest common subsequence length, two-row dynamic programming
fn lcs_length(a: &[&str], b: &[&str]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            curr[j + 1] = if token_a == token_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
