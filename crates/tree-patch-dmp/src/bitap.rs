//! Bitap fuzzy string matching.
//!
//! Locates a pattern in a text near an expected position, tolerating both
//! edit errors in the match and drift away from the expected location. This
//! is what lets a diff program apply against a string that has shifted since
//! the program was computed.

use std::collections::HashMap;

/// At what similarity a fuzzy match is still accepted (0.0 = exact only).
const MATCH_THRESHOLD: f64 = 0.5;

/// How far from the expected location a match may stray before the distance
/// penalty alone rejects it.
const MATCH_DISTANCE: usize = 1000;

/// Bitap operates on machine-word bitmasks; patterns longer than this must
/// be anchored by their ends instead.
pub const MAX_BITS: usize = 32;

/// Locate `pattern` in `text` near char position `loc`.
///
/// Returns the char index of the best match, or `None` when nothing scores
/// under the acceptance threshold.
pub fn match_main(text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
    let loc = loc.min(text.len());
    if pattern.is_empty() {
        return Some(loc);
    }
    if text.is_empty() {
        return None;
    }
    if loc + pattern.len() <= text.len() && text[loc..loc + pattern.len()] == pattern[..] {
        // Exact match at the expected position.
        return Some(loc);
    }
    bitap(text, pattern, loc)
}

/// Match score for `errors` edit errors at position `x`; lower is better.
fn score(errors: usize, x: usize, loc: usize, pattern_len: usize) -> f64 {
    let accuracy = errors as f64 / pattern_len as f64;
    let proximity = loc.abs_diff(x);
    if proximity == 0 {
        return accuracy;
    }
    accuracy + proximity as f64 / MATCH_DISTANCE as f64
}

/// Bitmask per pattern char, bit i set when the char occurs at offset i.
fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks: HashMap<char, u64> = HashMap::with_capacity(pattern.len());
    for (i, &c) in pattern.iter().enumerate() {
        *masks.entry(c).or_insert(0) |= 1u64 << (pattern.len() - i - 1);
    }
    masks
}

fn find_from(text: &[char], pattern: &[char], from: usize) -> Option<usize> {
    if from > text.len() || pattern.len() > text.len() - from {
        return None;
    }
    text[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|i| i + from)
}

fn rfind_until(text: &[char], pattern: &[char], until: usize) -> Option<usize> {
    let until = until.min(text.len().saturating_sub(pattern.len()));
    (0..=until).rev().find(|&i| &text[i..i + pattern.len()] == pattern)
}

fn bitap(text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
    debug_assert!(pattern.len() <= MAX_BITS, "pattern too long for bitap");

    let masks = alphabet(pattern);
    let mut threshold = MATCH_THRESHOLD;

    // An exact occurrence at or after the expected location tightens the
    // threshold before the fuzzy scan; only then is one before it also
    // considered. Occurrences far before `loc` must not pre-bias the scan.
    if let Some(at) = find_from(text, pattern, loc) {
        threshold = threshold.min(score(0, at, loc, pattern.len()));
        if let Some(at) = rfind_until(text, pattern, loc + pattern.len()) {
            threshold = threshold.min(score(0, at, loc, pattern.len()));
        }
    }

    let match_mask = 1u64 << (pattern.len() - 1);
    let mut best_loc: Option<usize> = None;

    let mut bin_max = pattern.len() + text.len();
    let mut last_rd: Vec<u64> = Vec::new();

    for d in 0..pattern.len() {
        // Binary search for the widest window still under the threshold at
        // this error count.
        let mut bin_min = 0usize;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if score(d, loc + bin_mid, loc, pattern.len()) <= threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = 1.max((loc + 1).saturating_sub(bin_mid));
        let finish = (loc + bin_mid).min(text.len()) + pattern.len();

        let mut rd: Vec<u64> = vec![0; finish + 2];
        rd[finish + 1] = (1u64 << d) - 1;

        let mut j = finish;
        while j >= start {
            let char_match = if j <= text.len() {
                masks.get(&text[j - 1]).copied().unwrap_or(0)
            } else {
                0
            };
            rd[j] = if d == 0 {
                ((rd[j + 1] << 1) | 1) & char_match
            } else {
                (((rd[j + 1] << 1) | 1) & char_match)
                    | (((last_rd[j + 1] | last_rd[j]) << 1) | 1)
                    | last_rd[j + 1]
            };
            if rd[j] & match_mask != 0 {
                let s = score(d, j - 1, loc, pattern.len());
                if s <= threshold {
                    threshold = s;
                    best_loc = Some(j - 1);
                    if j - 1 > loc {
                        // Keep scanning left of the expected location only.
                        start = 1.max((2 * loc + 1).saturating_sub(j));
                    } else {
                        break;
                    }
                }
            }
            j -= 1;
        }

        // One more error can no longer beat the current threshold.
        if score(d + 1, loc, loc, pattern.len()) > threshold {
            break;
        }
        last_rd = rd;
    }

    best_loc
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn empty_pattern_matches_at_loc() {
        assert_eq!(match_main(&chars("abcdef"), &chars(""), 3), Some(3));
    }

    #[test]
    fn exact_match_at_expected_location() {
        assert_eq!(match_main(&chars("abcdef"), &chars("cde"), 2), Some(2));
    }

    #[test]
    fn exact_match_elsewhere() {
        assert_eq!(match_main(&chars("abcdef"), &chars("def"), 0), Some(3));
    }

    #[test]
    fn fuzzy_match_with_one_error() {
        // "fox" vs "fix" one substitution away from the expected spot.
        let found = match_main(&chars("the quick brown fix jumps"), &chars("fox"), 16);
        assert_eq!(found, Some(16));
    }

    #[test]
    fn no_match_in_unrelated_text() {
        assert_eq!(match_main(&chars("zzzzzzzzzz"), &chars("abcdefg"), 0), None);
    }

    #[test]
    fn drifted_match_is_found() {
        // Pattern occurs, but well after the expected location.
        let text = chars("0123456789 the pattern sits here");
        assert_eq!(match_main(&text, &chars("pattern"), 0), Some(15));
    }

    #[test]
    fn distant_exact_occurrence_does_not_mask_fuzzy_match_at_loc() {
        // One exact copy of the pattern sits 450 chars before the expected
        // location, and a one-error copy sits exactly at it. The near fuzzy
        // match scores better (0.1 vs 0.45) and must win.
        let text = chars(&format!("abcdefghij{}abcdeXghij", "z".repeat(440)));
        let found = match_main(&text, &chars("abcdefghij"), 450);
        assert_eq!(found, Some(450));
    }

    #[test]
    fn empty_text_has_no_match() {
        assert_eq!(match_main(&chars(""), &chars("abc"), 0), None);
    }
}
