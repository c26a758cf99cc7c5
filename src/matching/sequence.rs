//! Longest-matching-block sequence similarity.
//!
//! `ratio = 2 * M / T` where `M` is the number of characters covered by the
//! recursively found longest common blocks and `T` the combined length.

/// Similarity of two strings in `[0, 1]`; two empty strings score 0.0
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }

    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Characters covered by matching blocks, found longest-first
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_block(a, b);
    if size == 0 {
        return 0;
    }

    size + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + size..], &b[j + size..])
}

/// Longest common contiguous block as `(start_a, start_b, len)`
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                current[j] = previous[j - 1] + 1;
                let size = current[j];
                // strict: the first block of a given length found is the earliest
                if size > best.2 {
                    best = (i - size, j - size, size);
                }
            }
        }
        previous = current;
    }

    best
}
