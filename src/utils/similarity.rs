//! String similarity (Ratcliff/Obershelp)
//!
//! ratio = 2·M / T where M is the number of characters in the matching
//! blocks and T the combined length. Matching blocks are found by taking
//! the longest common substring and recursing on both sides of it.

/// Similarity ratio in [0, 1]; two empty strings are identical
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// Total size of all matching blocks
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common run in a[alo..ahi] × b[blo..bhi].
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length ending at (i - 1, j) for the previous row
    let mut prev = vec![0usize; bhi.saturating_sub(blo) + 1];

    for i in alo..ahi {
        let mut row = vec![0usize; prev.len()];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let col = j - blo + 1;
            let k = prev[col - 1] + 1;
            row[col] = k;
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        prev = row;
    }

    (best_i, best_j, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_and_disjoint() {
        assert!(close(similarity_ratio("BONK", "BONK"), 1.0));
        assert!(close(similarity_ratio("ABC", "XYZ"), 0.0));
        assert!(close(similarity_ratio("", ""), 1.0));
        assert!(close(similarity_ratio("ABC", ""), 0.0));
    }

    #[test]
    fn test_known_ratios() {
        // SOLANAA vs SOLANA: M=6, T=13
        assert!(close(similarity_ratio("SOLANAA", "SOLANA"), 12.0 / 13.0));
        // BONDG vs BONK: M=3, T=9
        assert!(close(similarity_ratio("BONDG", "BONK"), 6.0 / 9.0));
        // abcd vs bcde: M=3, T=8
        assert!(close(similarity_ratio("abcd", "bcde"), 0.75));
    }

    #[test]
    fn test_recurses_on_both_sides() {
        // "XabYcd" vs "abZcd": blocks "ab" and "cd"
        assert!(close(similarity_ratio("XabYcd", "abZcd"), 8.0 / 11.0));
    }
}
