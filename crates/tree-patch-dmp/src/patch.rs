//! Patch blocks and the serialized diff-program format.
//!
//! A diff program is a sequence of context-anchored blocks in the classic
//! `@@ -start,len +start,len @@` text format, one encoded line per
//! insert/delete/equal run. Application is best-effort: each block is located
//! by fuzzy context matching, so a program still applies when the target
//! string has drifted since the program was computed.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::bitap::{match_main, MAX_BITS};
use crate::diff::{diff, levenshtein, source_text, target_text, x_index, Diff, DiffOp};

/// Chars of context carried on each side of a block.
const PATCH_MARGIN: usize = 4;

/// When a fuzzily matched long block differs from its context by more than
/// this fraction, the block is skipped rather than applied.
const DELETE_THRESHOLD: f64 = 0.5;

/// Everything but the characters `encodeURI` leaves intact (plus space).
const LINE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'_')
    .remove(b'~');

// ── Types ─────────────────────────────────────────────────────────────────

/// One context-anchored block of a diff program.
///
/// `start1`/`length1` address the source string, `start2`/`length2` the
/// target string; all in chars, 0-based internally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchBlock {
    pub diffs: Vec<Diff>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextPatchError {
    #[error("invalid patch block header: {0:?}")]
    InvalidHeader(String),
    #[error("invalid patch line: {0:?}")]
    InvalidLine(String),
    #[error("invalid character encoding in patch line: {0:?}")]
    InvalidEncoding(String),
}

// ── Building ──────────────────────────────────────────────────────────────

/// Build the patch blocks transforming `source` into `target`.
pub fn make(source: &str, target: &str) -> Vec<PatchBlock> {
    from_diffs(source, &diff(source, target))
}

/// Build patch blocks from a precomputed edit script over `source`.
pub fn from_diffs(source: &str, diffs: &[Diff]) -> Vec<PatchBlock> {
    if diffs.is_empty() {
        return vec![];
    }

    let mut patches: Vec<PatchBlock> = Vec::new();
    let mut patch = PatchBlock::default();
    let mut char_count1 = 0usize;
    let mut char_count2 = 0usize;
    // Text state before and after the blocks collected so far; context is
    // cut from the "before" state.
    let mut prepatch: Vec<char> = source.chars().collect();
    let mut postpatch: Vec<char> = prepatch.clone();

    for (x, d) in diffs.iter().enumerate() {
        let run_len = d.len();
        if patch.diffs.is_empty() && d.0 != DiffOp::Equal {
            patch.start1 = char_count1;
            patch.start2 = char_count2;
        }

        match d.0 {
            DiffOp::Insert => {
                patch.diffs.push(d.clone());
                patch.length2 += run_len;
                let ins: Vec<char> = d.1.chars().collect();
                postpatch.splice(char_count2..char_count2, ins);
            }
            DiffOp::Delete => {
                patch.length1 += run_len;
                patch.diffs.push(d.clone());
                postpatch.drain(char_count2..char_count2 + run_len);
            }
            DiffOp::Equal => {
                if run_len <= 2 * PATCH_MARGIN && !patch.diffs.is_empty() && x != diffs.len() - 1
                {
                    // Small equality between edits: keep it inside the block.
                    patch.diffs.push(d.clone());
                    patch.length1 += run_len;
                    patch.length2 += run_len;
                } else if run_len >= 2 * PATCH_MARGIN && !patch.diffs.is_empty() {
                    // Large equality: close the current block.
                    add_context(&mut patch, &prepatch);
                    patches.push(std::mem::take(&mut patch));
                    prepatch = postpatch.clone();
                    char_count1 = char_count2;
                }
            }
        }

        if d.0 != DiffOp::Insert {
            char_count1 += run_len;
        }
        if d.0 != DiffOp::Delete {
            char_count2 += run_len;
        }
    }

    if !patch.diffs.is_empty() {
        add_context(&mut patch, &prepatch);
        patches.push(patch);
    }
    patches
}

/// Grow a block's equal context until it uniquely identifies its position,
/// within the Bitap pattern limit.
fn add_context(patch: &mut PatchBlock, text: &[char]) {
    if text.is_empty() {
        return;
    }
    let mut pattern: Vec<char> = text[patch.start2..patch.start2 + patch.length1].to_vec();
    let mut padding = 0usize;

    while !is_unique(text, &pattern) && pattern.len() < MAX_BITS - 2 * PATCH_MARGIN {
        padding += PATCH_MARGIN;
        let lo = patch.start2.saturating_sub(padding);
        let hi = (patch.start2 + patch.length1 + padding).min(text.len());
        pattern = text[lo..hi].to_vec();
    }
    padding += PATCH_MARGIN;

    let prefix: Vec<char> = text[patch.start2.saturating_sub(padding)..patch.start2].to_vec();
    let suffix: Vec<char> = text
        [patch.start2 + patch.length1..(patch.start2 + patch.length1 + padding).min(text.len())]
        .to_vec();

    if !prefix.is_empty() {
        patch.diffs.insert(0, Diff(DiffOp::Equal, prefix.iter().collect()));
    }
    if !suffix.is_empty() {
        patch.diffs.push(Diff(DiffOp::Equal, suffix.iter().collect()));
    }
    patch.start1 -= prefix.len();
    patch.start2 -= prefix.len();
    patch.length1 += prefix.len() + suffix.len();
    patch.length2 += prefix.len() + suffix.len();
}

fn is_unique(text: &[char], pattern: &[char]) -> bool {
    if pattern.is_empty() || pattern.len() > text.len() {
        return true;
    }
    text.windows(pattern.len()).filter(|w| *w == pattern).count() <= 1
}

// ── Serialization ─────────────────────────────────────────────────────────

fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}

/// Serialize patch blocks into diff-program text.
pub fn stringify(blocks: &[PatchBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            coords(block.start1, block.length1),
            coords(block.start2, block.length2),
        ));
        for d in &block.diffs {
            out.push(match d.0 {
                DiffOp::Insert => '+',
                DiffOp::Delete => '-',
                DiffOp::Equal => ' ',
            });
            out.push_str(&utf8_percent_encode(&d.1, LINE_ENCODE_SET).to_string());
            out.push('\n');
        }
    }
    out
}

fn parse_coords(part: &str, header: &str) -> Result<(usize, usize), TextPatchError> {
    let invalid = || TextPatchError::InvalidHeader(header.to_string());
    match part.split_once(',') {
        Some((start, len)) => {
            let start: usize = start.parse().map_err(|_| invalid())?;
            let length: usize = len.parse().map_err(|_| invalid())?;
            if length == 0 {
                Ok((start, 0))
            } else {
                Ok((start.checked_sub(1).ok_or_else(invalid)?, length))
            }
        }
        None => {
            let start: usize = part.parse().map_err(|_| invalid())?;
            Ok((start.checked_sub(1).ok_or_else(invalid)?, 1))
        }
    }
}

fn parse_header(line: &str) -> Result<PatchBlock, TextPatchError> {
    let invalid = || TextPatchError::InvalidHeader(line.to_string());
    let body = line
        .strip_prefix("@@ -")
        .and_then(|s| s.strip_suffix(" @@"))
        .ok_or_else(invalid)?;
    let (coords1, coords2) = body.split_once(" +").ok_or_else(invalid)?;
    let (start1, length1) = parse_coords(coords1, line)?;
    let (start2, length2) = parse_coords(coords2, line)?;
    Ok(PatchBlock {
        diffs: vec![],
        start1,
        start2,
        length1,
        length2,
    })
}

/// Parse diff-program text back into patch blocks.
pub fn parse(program: &str) -> Result<Vec<PatchBlock>, TextPatchError> {
    let mut blocks: Vec<PatchBlock> = Vec::new();
    for line in program.lines() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with("@@") {
            blocks.push(parse_header(line)?);
            continue;
        }
        let block = blocks
            .last_mut()
            .ok_or_else(|| TextPatchError::InvalidLine(line.to_string()))?;
        let op = match line.chars().next() {
            Some('+') => DiffOp::Insert,
            Some('-') => DiffOp::Delete,
            Some(' ') => DiffOp::Equal,
            _ => return Err(TextPatchError::InvalidLine(line.to_string())),
        };
        let text = percent_decode_str(&line[1..])
            .decode_utf8()
            .map_err(|_| TextPatchError::InvalidEncoding(line.to_string()))?
            .into_owned();
        block.diffs.push(Diff(op, text));
    }
    Ok(blocks)
}

// ── Application ───────────────────────────────────────────────────────────

/// Pad block edges with sentinel context so matches at the very start or end
/// of the text behave like interior matches. Returns the padding chars.
fn add_padding(patches: &mut [PatchBlock]) -> Vec<char> {
    let padding: Vec<char> = (1..=PATCH_MARGIN as u8).map(|i| i as char).collect();
    let pad_len = padding.len();

    for patch in patches.iter_mut() {
        patch.start1 += pad_len;
        patch.start2 += pad_len;
    }

    // First block: ensure it opens with enough equal context.
    if let Some(first) = patches.first_mut() {
        match first.diffs.first() {
            Some(Diff(DiffOp::Equal, text)) => {
                let have = text.chars().count();
                if pad_len > have {
                    let extra = pad_len - have;
                    let mut grown: String = padding[have..].iter().collect();
                    grown.push_str(text);
                    first.diffs[0].1 = grown;
                    first.start1 -= extra;
                    first.start2 -= extra;
                    first.length1 += extra;
                    first.length2 += extra;
                }
            }
            _ => {
                first
                    .diffs
                    .insert(0, Diff(DiffOp::Equal, padding.iter().collect()));
                first.start1 -= pad_len;
                first.start2 -= pad_len;
                first.length1 += pad_len;
                first.length2 += pad_len;
            }
        }
    }

    // Last block: ensure it closes with enough equal context.
    if let Some(last) = patches.last_mut() {
        match last.diffs.last() {
            Some(Diff(DiffOp::Equal, text)) => {
                let have = text.chars().count();
                if pad_len > have {
                    let extra = pad_len - have;
                    let grown: String = padding[..extra].iter().collect();
                    if let Some(d) = last.diffs.last_mut() {
                        d.1.push_str(&grown);
                    }
                    last.length1 += extra;
                    last.length2 += extra;
                }
            }
            _ => {
                last.diffs
                    .push(Diff(DiffOp::Equal, padding.iter().collect()));
                last.length1 += pad_len;
                last.length2 += pad_len;
            }
        }
    }

    padding
}

/// Apply patch blocks to `text`, returning the patched string and a per-block
/// success flag. Failed blocks are skipped, never partially applied against
/// the wrong location.
pub fn apply(blocks: &[PatchBlock], text: &str) -> (String, Vec<bool>) {
    if blocks.is_empty() {
        return (text.to_string(), vec![]);
    }

    let mut patches: Vec<PatchBlock> = blocks.to_vec();
    let padding = add_padding(&mut patches);
    let pad_len = padding.len();

    let mut chars: Vec<char> = padding
        .iter()
        .copied()
        .chain(text.chars())
        .chain(padding.iter().copied())
        .collect();

    let mut delta = 0isize;
    let mut results = vec![false; patches.len()];

    for (i, patch) in patches.iter().enumerate() {
        let expected = (patch.start2 as isize + delta).max(0) as usize;
        let text1: Vec<char> = source_text(&patch.diffs).chars().collect();

        let mut end_loc: Option<usize> = None;
        let start_loc = if text1.len() > MAX_BITS {
            // Long context: anchor by its first and last MAX_BITS chars.
            match match_main(&chars, &text1[..MAX_BITS], expected) {
                Some(start) => {
                    end_loc = match_main(
                        &chars,
                        &text1[text1.len() - MAX_BITS..],
                        expected + text1.len() - MAX_BITS,
                    );
                    match end_loc {
                        Some(end) if start < end => Some(start),
                        _ => None,
                    }
                }
                None => None,
            }
        } else {
            match_main(&chars, &text1, expected)
        };

        let Some(start) = start_loc else {
            // Unmatched context: skip this block and back out its delta.
            delta -= patch.length2 as isize - patch.length1 as isize;
            continue;
        };

        results[i] = true;
        delta = start as isize - expected as isize;

        let end = match end_loc {
            Some(e) => (e + MAX_BITS).min(chars.len()),
            None => (start + text1.len()).min(chars.len()),
        };
        let text2: Vec<char> = chars[start..end].to_vec();

        if text1 == text2 {
            // Exact context: splice the target text straight in.
            let replacement: Vec<char> = target_text(&patch.diffs).chars().collect();
            chars.splice(start..start + text1.len(), replacement);
            continue;
        }

        // Imperfect context: re-diff it and map each edit through the drift.
        let found: String = text2.iter().collect();
        let expected_src: String = text1.iter().collect();
        let drift = diff(&expected_src, &found);
        if text1.len() > MAX_BITS
            && levenshtein(&drift) as f64 / text1.len() as f64 > DELETE_THRESHOLD
        {
            results[i] = false;
            continue;
        }

        let mut index1 = 0usize;
        for d in &patch.diffs {
            match d.0 {
                DiffOp::Insert => {
                    let at = start + x_index(&drift, index1);
                    let ins: Vec<char> = d.1.chars().collect();
                    chars.splice(at..at, ins);
                }
                DiffOp::Delete => {
                    let from = start + x_index(&drift, index1);
                    let to = start + x_index(&drift, index1 + d.len());
                    chars.drain(from..to);
                }
                DiffOp::Equal => {}
            }
            if d.0 != DiffOp::Delete {
                index1 += d.len();
            }
        }
    }

    let patched: String = chars[pad_len..chars.len() - pad_len].iter().collect();
    (patched, results)
}

/// Parse a diff program and apply it to `current` in one step.
///
/// Application itself is best-effort (unmatched blocks degrade silently);
/// only a malformed program is an error.
pub fn apply_text_patch(current: &str, program: &str) -> Result<String, TextPatchError> {
    let blocks = parse(program)?;
    Ok(apply(&blocks, current).0)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_empty_for_equal_strings() {
        assert!(make("same text", "same text").is_empty());
    }

    #[test]
    fn stringify_parse_round_trip() {
        let blocks = make(
            "The quick brown fox jumps over the lazy dog.",
            "The quick red fox leaps over the lazy dog.",
        );
        let program = stringify(&blocks);
        assert_eq!(parse(&program).unwrap(), blocks);
    }

    #[test]
    fn stringify_encodes_special_chars() {
        let blocks = make("a\nb", "a\nc %");
        let program = stringify(&blocks);
        assert!(program.contains("%0A"), "newline is encoded: {program:?}");
        assert_eq!(parse(&program).unwrap(), blocks);
    }

    #[test]
    fn coords_follow_unified_diff_conventions() {
        assert_eq!(coords(3, 0), "3,0");
        assert_eq!(coords(3, 1), "4");
        assert_eq!(coords(3, 5), "4,5");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse("@@ nonsense @@\n"),
            Err(TextPatchError::InvalidHeader(_))
        ));
        assert!(matches!(
            parse("no header line"),
            Err(TextPatchError::InvalidLine(_))
        ));
    }

    #[test]
    fn apply_exact() {
        let blocks = make("hello world", "goodbye world");
        let (out, ok) = apply(&blocks, "hello world");
        assert_eq!(out, "goodbye world");
        assert!(ok.iter().all(|&b| b));
    }

    #[test]
    fn apply_tolerates_drift() {
        // The target string gained a prefix since the program was computed.
        let blocks = make("The cat sat on the mat.", "The cat sat on the hat.");
        let (out, ok) = apply(&blocks, "Breaking: The cat sat on the mat.");
        assert_eq!(out, "Breaking: The cat sat on the hat.");
        assert!(ok.iter().all(|&b| b));
    }

    #[test]
    fn apply_skips_unmatched_block() {
        let blocks = make("completely different text here", "completely altered text here");
        let (out, ok) = apply(&blocks, "zzzz qqqq xxxx wwww");
        assert_eq!(out, "zzzz qqqq xxxx wwww");
        assert!(ok.iter().all(|&b| !b));
    }

    #[test]
    fn apply_text_patch_round_trip() {
        let cases = [
            ("", "something from nothing"),
            ("delete me entirely", ""),
            ("shared prefix ends here", "shared prefix continues there"),
            ("unicode: héllo wörld ✨", "unicode: héllo world ✨!"),
        ];
        for (a, b) in cases {
            let program = stringify(&make(a, b));
            assert_eq!(apply_text_patch(a, &program).unwrap(), b, "{a:?} -> {b:?}");
        }
    }
}
