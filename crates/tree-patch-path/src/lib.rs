//! Path model for tree-patch.
//!
//! A path addresses one node inside a JSON-like document tree. It is an
//! ordered sequence of segments, each one of:
//!
//! - a numeric array index (`[0]`),
//! - a string property name (`foo`),
//! - a keyed selector (`[_key=="a1"]`) addressing an array element by its
//!   `_key` identity field rather than by position.
//!
//! # Example
//!
//! ```
//! use tree_patch_path::{parse_path, format_path, PathSegment};
//!
//! let path = parse_path(r#"body[_key=="a1"].children[0].text"#).unwrap();
//! assert_eq!(path[0], PathSegment::Field("body".into()));
//! assert_eq!(path[1], PathSegment::Key("a1".into()));
//! assert_eq!(path[3], PathSegment::Index(0));
//! assert_eq!(format_path(&path), r#"body[_key=="a1"].children[0].text"#);
//! ```

use std::fmt;
use thiserror::Error;

// ── Types ─────────────────────────────────────────────────────────────────

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Positional array index.
    Index(usize),
    /// Object property name.
    Field(String),
    /// Content-addressed array selector; matches the first element whose
    /// `_key` field equals the given string.
    Key(String),
}

/// A full path, root-first. The empty path addresses the document root.
pub type Path = Vec<PathSegment>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("unexpected end of path string")]
    UnexpectedEnd,
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid array index {0:?}")]
    InvalidIndex(String),
    #[error("path has no parent")]
    NoParent,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Field(name) => write!(f, "{name}"),
            PathSegment::Key(key) => write!(f, "[_key==\"{key}\"]"),
        }
    }
}

// ── Formatting ────────────────────────────────────────────────────────────

/// Format a path into its string form.
///
/// Fields are joined with `.`, index and keyed segments attach directly with
/// brackets. The root path formats as the empty string.
///
/// # Example
///
/// ```
/// use tree_patch_path::{format_path, PathSegment};
///
/// let path = vec![
///     PathSegment::Field("items".into()),
///     PathSegment::Index(2),
///     PathSegment::Field("title".into()),
/// ];
/// assert_eq!(format_path(&path), "items[2].title");
/// assert_eq!(format_path(&[]), "");
/// ```
pub fn format_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        if let PathSegment::Field(_) = segment {
            if !out.is_empty() {
                out.push('.');
            }
        }
        out.push_str(&segment.to_string());
    }
    out
}

// ── Parsing ───────────────────────────────────────────────────────────────

/// Parse the string form of a path.
///
/// Accepted syntax: bare field names joined by `.`, numeric indices as
/// `[4]`, and keyed selectors as `[_key=="abc"]`. The empty string parses
/// to the root path. Quoted keys do not support escape sequences.
pub fn parse_path(input: &str) -> Result<Path, PathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut path = Path::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        match chars[pos] {
            '[' => {
                let (segment, next) = parse_bracket(&chars, pos + 1)?;
                path.push(segment);
                pos = next;
            }
            '.' => {
                // A dot only joins two field segments
                if path.is_empty() {
                    return Err(PathError::UnexpectedChar('.', pos));
                }
                pos += 1;
                let (field, next) = parse_field(&chars, pos)?;
                path.push(field);
                pos = next;
            }
            _ => {
                let (field, next) = parse_field(&chars, pos)?;
                path.push(field);
                pos = next;
            }
        }
    }

    Ok(path)
}

fn is_field_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-'
}

fn parse_field(chars: &[char], start: usize) -> Result<(PathSegment, usize), PathError> {
    if start >= chars.len() {
        return Err(PathError::UnexpectedEnd);
    }
    if !is_field_start(chars[start]) {
        return Err(PathError::UnexpectedChar(chars[start], start));
    }
    let mut end = start + 1;
    while end < chars.len() && is_field_char(chars[end]) {
        end += 1;
    }
    let name: String = chars[start..end].iter().collect();
    Ok((PathSegment::Field(name), end))
}

/// Parse the inside of a bracket segment, `start` pointing just past `[`.
fn parse_bracket(chars: &[char], start: usize) -> Result<(PathSegment, usize), PathError> {
    if start >= chars.len() {
        return Err(PathError::UnexpectedEnd);
    }
    if chars[start].is_ascii_digit() {
        let mut end = start;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
        let digits: String = chars[start..end].iter().collect();
        let index: usize = digits
            .parse()
            .map_err(|_| PathError::InvalidIndex(digits.clone()))?;
        expect(chars, end, ']')?;
        return Ok((PathSegment::Index(index), end + 1));
    }

    // Keyed selector: _key=="..."
    let prefix: Vec<char> = "_key==\"".chars().collect();
    if chars.len() < start + prefix.len() || chars[start..start + prefix.len()] != prefix[..] {
        return Err(PathError::UnexpectedChar(chars[start], start));
    }
    let key_start = start + prefix.len();
    let mut end = key_start;
    while end < chars.len() && chars[end] != '"' {
        end += 1;
    }
    if end >= chars.len() {
        return Err(PathError::UnexpectedEnd);
    }
    let key: String = chars[key_start..end].iter().collect();
    expect(chars, end + 1, ']')?;
    Ok((PathSegment::Key(key), end + 2))
}

fn expect(chars: &[char], pos: usize, c: char) -> Result<(), PathError> {
    match chars.get(pos) {
        Some(&found) if found == c => Ok(()),
        Some(&found) => Err(PathError::UnexpectedChar(found, pos)),
        None => Err(PathError::UnexpectedEnd),
    }
}

// ── Relations ─────────────────────────────────────────────────────────────

/// Check if two paths are equal.
pub fn is_equal(p1: &[PathSegment], p2: &[PathSegment]) -> bool {
    p1 == p2
}

/// Check if `prefix` addresses `path`'s node or an ancestor of it.
///
/// Equal paths count as prefixes. A strict descendant of `path` is not a
/// prefix of it.
///
/// # Example
///
/// ```
/// use tree_patch_path::{is_prefix, PathSegment};
///
/// let block = vec![PathSegment::Key("b".into())];
/// let marks = vec![PathSegment::Key("b".into()), PathSegment::Field("marks".into())];
/// assert!(is_prefix(&block, &marks));
/// assert!(is_prefix(&marks, &marks));
/// assert!(!is_prefix(&marks, &block));
/// ```
pub fn is_prefix(prefix: &[PathSegment], path: &[PathSegment]) -> bool {
    prefix.len() <= path.len() && prefix == &path[..prefix.len()]
}

/// Get the parent path of a given path.
///
/// # Errors
///
/// Returns an error for the root path.
pub fn parent(path: &[PathSegment]) -> Result<Path, PathError> {
    if path.is_empty() {
        return Err(PathError::NoParent);
    }
    Ok(path[..path.len() - 1].to_vec())
}

/// Check if a path points to the document root.
pub fn is_root(path: &[PathSegment]) -> bool {
    path.is_empty()
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_is_root() {
        assert_eq!(parse_path("").unwrap(), Vec::<PathSegment>::new());
    }

    #[test]
    fn parse_single_field() {
        assert_eq!(
            parse_path("title").unwrap(),
            vec![PathSegment::Field("title".into())]
        );
    }

    #[test]
    fn parse_nested_fields() {
        assert_eq!(
            parse_path("meta.author.name").unwrap(),
            vec![
                PathSegment::Field("meta".into()),
                PathSegment::Field("author".into()),
                PathSegment::Field("name".into()),
            ]
        );
    }

    #[test]
    fn parse_index_segment() {
        assert_eq!(
            parse_path("items[12]").unwrap(),
            vec![PathSegment::Field("items".into()), PathSegment::Index(12)]
        );
    }

    #[test]
    fn parse_keyed_segment() {
        assert_eq!(
            parse_path(r#"body[_key=="a1b2"]"#).unwrap(),
            vec![PathSegment::Field("body".into()), PathSegment::Key("a1b2".into())]
        );
    }

    #[test]
    fn parse_leading_bracket() {
        assert_eq!(
            parse_path(r#"[_key=="x"].marks"#).unwrap(),
            vec![PathSegment::Key("x".into()), PathSegment::Field("marks".into())]
        );
    }

    #[test]
    fn parse_rejects_leading_dot() {
        assert_eq!(
            parse_path(".foo"),
            Err(PathError::UnexpectedChar('.', 0))
        );
    }

    #[test]
    fn parse_rejects_unterminated_key() {
        assert_eq!(parse_path(r#"[_key=="x"#), Err(PathError::UnexpectedEnd));
    }

    #[test]
    fn format_round_trips() {
        for input in [
            "",
            "title",
            "items[0]",
            r#"body[_key=="a1"].children[3].text"#,
            "a.b.c[2][4]",
        ] {
            let path = parse_path(input).unwrap();
            assert_eq!(format_path(&path), input, "round-trip of {input:?}");
        }
    }

    #[test]
    fn prefix_relations() {
        let root: Path = vec![];
        let a = parse_path("a").unwrap();
        let ab = parse_path("a.b").unwrap();
        let ac = parse_path("a.c").unwrap();

        assert!(is_prefix(&root, &ab));
        assert!(is_prefix(&a, &ab));
        assert!(is_prefix(&ab, &ab));
        assert!(!is_prefix(&ab, &a));
        assert!(!is_prefix(&ac, &ab));
    }

    #[test]
    fn index_and_key_segments_are_distinct() {
        let by_index = vec![PathSegment::Index(0)];
        let by_key = vec![PathSegment::Key("0".into())];
        assert!(!is_prefix(&by_index, &by_key));
        assert!(!is_equal(&by_index, &by_key));
    }

    #[test]
    fn parent_of_path() {
        let ab = parse_path("a.b").unwrap();
        assert_eq!(parent(&ab).unwrap(), parse_path("a").unwrap());
        assert_eq!(parent(&[]), Err(PathError::NoParent));
    }
}
