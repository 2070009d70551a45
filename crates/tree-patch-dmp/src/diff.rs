//! Myers O(ND) character diff.
//!
//! Produces an edit script of delete/equal/insert runs transforming a source
//! string into a target string. Equal runs are kept so the script carries the
//! context the patch layer anchors on.

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Delete,
    Equal,
    Insert,
}

/// One run of the edit script: an operation and the text it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff(pub DiffOp, pub String);

impl Diff {
    pub fn op(&self) -> DiffOp {
        self.0
    }

    pub fn text(&self) -> &str {
        &self.1
    }

    /// Run length in chars.
    pub fn len(&self) -> usize {
        self.1.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.1.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────

/// Compute the edit script transforming `source` into `target`.
pub fn diff(source: &str, target: &str) -> Vec<Diff> {
    let a: Vec<char> = source.chars().collect();
    let b: Vec<char> = target.chars().collect();
    diff_chars(&a, &b)
}

/// Reconstruct the source string of an edit script (equal + delete runs).
pub fn source_text(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.0 != DiffOp::Insert)
        .map(|d| d.1.as_str())
        .collect()
}

/// Reconstruct the target string of an edit script (equal + insert runs).
pub fn target_text(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.0 != DiffOp::Delete)
        .map(|d| d.1.as_str())
        .collect()
}

/// Invert an edit script so it transforms the target back into the source.
pub fn invert(diffs: Vec<Diff>) -> Vec<Diff> {
    diffs
        .into_iter()
        .map(|Diff(op, text)| {
            let op = match op {
                DiffOp::Delete => DiffOp::Insert,
                DiffOp::Insert => DiffOp::Delete,
                DiffOp::Equal => DiffOp::Equal,
            };
            Diff(op, text)
        })
        .collect()
}

/// Map a char position in the source string to the equivalent position in
/// the target string.
pub fn x_index(diffs: &[Diff], loc: usize) -> usize {
    let mut chars1 = 0usize;
    let mut chars2 = 0usize;
    let mut last_chars1 = 0usize;
    let mut last_chars2 = 0usize;
    let mut overshot: Option<&Diff> = None;
    for d in diffs {
        if d.0 != DiffOp::Insert {
            chars1 += d.len();
        }
        if d.0 != DiffOp::Delete {
            chars2 += d.len();
        }
        if chars1 > loc {
            overshot = Some(d);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }
    // A position inside a deletion collapses to the deletion point.
    if let Some(d) = overshot {
        if d.0 == DiffOp::Delete {
            return last_chars2;
        }
    }
    last_chars2 + (loc - last_chars1)
}

/// Levenshtein distance implied by an edit script.
pub fn levenshtein(diffs: &[Diff]) -> usize {
    let mut total = 0usize;
    let mut insertions = 0usize;
    let mut deletions = 0usize;
    for d in diffs {
        match d.0 {
            DiffOp::Insert => insertions += d.len(),
            DiffOp::Delete => deletions += d.len(),
            DiffOp::Equal => {
                total += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    total + insertions.max(deletions)
}

// ── Char-slice internals ──────────────────────────────────────────────────

pub(crate) fn diff_chars(a: &[char], b: &[char]) -> Vec<Diff> {
    if a == b {
        return if a.is_empty() {
            vec![]
        } else {
            vec![Diff(DiffOp::Equal, collect(a))]
        };
    }

    let p = common_prefix(a, b);
    let s = common_suffix(&a[p..], &b[p..]);

    let mut out = compute(&a[p..a.len() - s], &b[p..b.len() - s]);
    if p > 0 {
        out.insert(0, Diff(DiffOp::Equal, collect(&a[..p])));
    }
    if s > 0 {
        out.push(Diff(DiffOp::Equal, collect(&a[a.len() - s..])));
    }
    cleanup_merge(&mut out);
    out
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Number of chars in the common prefix of `a` and `b`.
pub(crate) fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Number of chars in the common suffix of `a` and `b`.
pub(crate) fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn find_sub(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Diff two blocks that share no common prefix or suffix.
fn compute(a: &[char], b: &[char]) -> Vec<Diff> {
    if a.is_empty() {
        return if b.is_empty() {
            vec![]
        } else {
            vec![Diff(DiffOp::Insert, collect(b))]
        };
    }
    if b.is_empty() {
        return vec![Diff(DiffOp::Delete, collect(a))];
    }

    let (long, short, a_is_long) = if a.len() > b.len() { (a, b, true) } else { (b, a, false) };

    // Shorter text contained inside the longer one.
    if let Some(at) = find_sub(long, short) {
        let edit = if a_is_long { DiffOp::Delete } else { DiffOp::Insert };
        let mut out = Vec::with_capacity(3);
        if at > 0 {
            out.push(Diff(edit, collect(&long[..at])));
        }
        out.push(Diff(DiffOp::Equal, collect(short)));
        if at + short.len() < long.len() {
            out.push(Diff(edit, collect(&long[at + short.len()..])));
        }
        return out;
    }

    // A single-char side that is not contained cannot share anything.
    if short.len() == 1 {
        return vec![Diff(DiffOp::Delete, collect(a)), Diff(DiffOp::Insert, collect(b))];
    }

    bisect(a, b)
}

// ── Bisect ────────────────────────────────────────────────────────────────

/// Find the middle snake of the edit graph and recurse on both halves.
fn bisect(a: &[char], b: &[char]) -> Vec<Diff> {
    let n = a.len() as i64;
    let m = b.len() as i64;
    let max_d = ((n + m + 1) / 2 + 1) as usize;
    let offset = max_d as i64;
    let width = 2 * max_d;

    let mut fwd: Vec<i64> = vec![-1; width];
    let mut rev: Vec<i64> = vec![-1; width];
    fwd[max_d + 1] = 0;
    rev[max_d + 1] = 0;

    let delta = n - m;
    // When delta is odd the paths can only overlap while stepping forward.
    let front = delta % 2 != 0;

    let mut fwd_start = 0i64;
    let mut fwd_end = 0i64;
    let mut rev_start = 0i64;
    let mut rev_end = 0i64;

    for d in 0..max_d as i64 {
        let mut k = -d + fwd_start;
        while k <= d - fwd_end {
            let ki = (offset + k) as usize;
            let mut x = if k == -d || (k != d && fwd[ki - 1] < fwd[ki + 1]) {
                fwd[ki + 1]
            } else {
                fwd[ki - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            fwd[ki] = x;
            if x > n {
                fwd_end += 2;
            } else if y > m {
                fwd_start += 2;
            } else if front {
                let ri = offset + delta - k;
                if ri >= 0 && (ri as usize) < width && rev[ri as usize] != -1 {
                    let rx = n - rev[ri as usize];
                    if x >= rx {
                        return bisect_split(a, b, x as usize, y as usize);
                    }
                }
            }
            k += 2;
        }

        let mut k = -d + rev_start;
        while k <= d - rev_end {
            let ki = (offset + k) as usize;
            let mut x = if k == -d || (k != d && rev[ki - 1] < rev[ki + 1]) {
                rev[ki + 1]
            } else {
                rev[ki - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[(n - 1 - x) as usize] == b[(m - 1 - y) as usize] {
                x += 1;
                y += 1;
            }
            rev[ki] = x;
            if x > n {
                rev_end += 2;
            } else if y > m {
                rev_start += 2;
            } else if !front {
                let fi = offset + delta - k;
                if fi >= 0 && (fi as usize) < width && fwd[fi as usize] != -1 {
                    let fx = fwd[fi as usize];
                    let fy = offset + fx - fi;
                    if fx >= n - x {
                        return bisect_split(a, b, fx as usize, fy as usize);
                    }
                }
            }
            k += 2;
        }
    }

    // Paths never crossed: no commonality at all.
    vec![Diff(DiffOp::Delete, collect(a)), Diff(DiffOp::Insert, collect(b))]
}

fn bisect_split(a: &[char], b: &[char], x: usize, y: usize) -> Vec<Diff> {
    let mut out = diff_chars(&a[..x], &b[..y]);
    out.extend(diff_chars(&a[x..], &b[y..]));
    out
}

// ── Merge cleanup ─────────────────────────────────────────────────────────

/// Merge adjacent runs of the same type, drop empty runs, and factor common
/// affixes of paired delete/insert runs into the neighboring equalities.
pub(crate) fn cleanup_merge(diffs: &mut Vec<Diff>) {
    let mut out: Vec<Diff> = Vec::with_capacity(diffs.len());
    let mut del: Vec<char> = Vec::new();
    let mut ins: Vec<char> = Vec::new();

    let flush =
        |out: &mut Vec<Diff>, del: &mut Vec<char>, ins: &mut Vec<char>, eq: &mut Vec<char>| {
            if !del.is_empty() && !ins.is_empty() {
                // Common prefix belongs to the preceding equality.
                let p = common_prefix(ins, del);
                if p > 0 {
                    let prefix = collect(&ins[..p]);
                    match out.last_mut() {
                        Some(Diff(DiffOp::Equal, text)) => text.push_str(&prefix),
                        _ => out.insert(0, Diff(DiffOp::Equal, prefix)),
                    }
                    ins.drain(..p);
                    del.drain(..p);
                }
                // Common suffix belongs to the following equality.
                let s = common_suffix(ins, del);
                if s > 0 {
                    let mut suffix: Vec<char> = ins[ins.len() - s..].to_vec();
                    ins.truncate(ins.len() - s);
                    del.truncate(del.len() - s);
                    suffix.extend(eq.iter());
                    *eq = suffix;
                }
            }
            if !del.is_empty() {
                out.push(Diff(DiffOp::Delete, collect(del)));
                del.clear();
            }
            if !ins.is_empty() {
                out.push(Diff(DiffOp::Insert, collect(ins)));
                ins.clear();
            }
            if !eq.is_empty() {
                match out.last_mut() {
                    Some(Diff(DiffOp::Equal, text)) => text.push_str(&collect(eq)),
                    _ => out.push(Diff(DiffOp::Equal, collect(eq))),
                }
            }
        };

    for Diff(op, text) in diffs.drain(..) {
        if text.is_empty() {
            continue;
        }
        match op {
            DiffOp::Delete => del.extend(text.chars()),
            DiffOp::Insert => ins.extend(text.chars()),
            DiffOp::Equal => {
                let mut eq: Vec<char> = text.chars().collect();
                flush(&mut out, &mut del, &mut ins, &mut eq);
            }
        }
    }
    let mut eq: Vec<char> = Vec::new();
    flush(&mut out, &mut del, &mut ins, &mut eq);

    *diffs = out;
}

// ── Tests ─────────────────────────────────────────────────────────────────
