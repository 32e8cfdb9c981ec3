//! Character-level string similarity.
//!
//! The score is the longest-matching-block ratio: find the longest common
//! run of characters, recurse on the pieces to its left and right, and
//! report `2 * matched / (len_a + len_b)`.

use std::collections::HashMap;

/// Case-insensitive similarity in `[0, 1]`. Two empty strings score `1.0`.
pub fn score(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    // The block search breaks ties by position, so order the pair to keep
    // score(a, b) == score(b, a).
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo: Vec<char> = lo.chars().collect();
    let hi: Vec<char> = hi.chars().collect();

    let total = lo.len() + hi.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_chars(&lo, &hi);
    (2 * matched) as f64 / total as f64
}

/// Round a score to three decimals, as reported in match results.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
/// Earliest start in `a`, then in `b`, wins ties.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    // run length of the match ending at b[j], for the previous row of a
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_len {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_len = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(score("How do I reset my password?", "How do I reset my password?"), 1.0);
        assert_eq!(score("", ""), 1.0);
    }

    #[test]
    fn comparison_ignores_case() {
        assert_eq!(score("RESET PASSWORD", "reset password"), 1.0);
    }

    #[test]
    fn empty_against_text_scores_zero() {
        assert_eq!(score("", "anything"), 0.0);
        assert_eq!(score("abc", "xyz"), 0.0);
    }

    #[test]
    fn matches_block_ratio_on_known_pairs() {
        // 2 * 9 / (9 + 27)
        assert!(close(score("reset pwd", "How do I reset my password?"), 0.5));
        assert!(close(score("abcd", "bcde"), 0.75));
        assert!(close(score("refunds", "Do you offer refunds?"), 0.5));
    }

    #[test]
    fn score_is_symmetric() {
        let pairs = [
            ("Can I use the app offline?", "What is the weather today?"),
            ("How can I update my billing address?", "password reset help"),
            ("Do you offer refunds?", "Can the app work offline?"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn closer_strings_score_higher() {
        let target = "How do I reset my password?";
        let near = score("How do I reset my pass", target);
        let far = score("reset pwd", target);
        assert!(near > far);
        assert!(score("xyz", target) < far);
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(score("¿Cómo estás?", "¿CÓMO ESTÁS?"), 1.0);
        assert!(score("naïve", "naive") > 0.7);
    }

    #[test]
    fn round3_keeps_three_decimals() {
        assert_eq!(round3(0.49999), 0.5);
        assert_eq!(round3(0.12345), 0.123);
    }
}
