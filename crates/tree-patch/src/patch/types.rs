//! Core types for the patch module.

use serde_json::{Number, Value};
use thiserror::Error;

pub use tree_patch_path::{Path, PathSegment};

use tree_patch_dmp::TextPatchError;

// ── Errors ────────────────────────────────────────────────────────────────

/// Fatal application failures. These always indicate a caller bug — a patch
/// generated against an incompatible document shape. Unresolvable selectors
/// are *not* errors; the engine silently leaves the value unchanged instead.
#[derive(Debug, Error, PartialEq)]
pub enum ApplyError {
    #[error("cannot apply deep operations on {kind} values")]
    DeepOnLeaf { kind: &'static str },
    #[error("cannot apply patch of type {op:?} to {kind} value")]
    UnsupportedOp { op: &'static str, kind: &'static str },
    #[error("cannot replace {kind} value with {found} value")]
    TypeMismatch {
        kind: &'static str,
        found: &'static str,
    },
    #[error("object members must be addressed by field name")]
    InvalidObjectSegment,
    #[error("arithmetic produced a non-finite number")]
    NonFinite,
    #[error(transparent)]
    Text(#[from] TextPatchError),
}

// ── Origin ────────────────────────────────────────────────────────────────

/// Provenance tag carried by a patch. The apply engine never reads it; the
/// conflict arbiter and the sync driver do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
    Internal,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
            Origin::Internal => "internal",
        }
    }
}

// ── Insert position ───────────────────────────────────────────────────────

/// Where an `insert` splices its items, relative to the addressed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
    Replace,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
            InsertPosition::Replace => "replace",
        }
    }
}

// ── Patch enum ────────────────────────────────────────────────────────────

/// A single declarative edit targeting one path within a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replace the addressed node.
    Set {
        path: Path,
        value: Value,
        origin: Option<Origin>,
    },
    /// Like `set`, but only when the addressed node is absent. An explicit
    /// `null` counts as present and blocks it.
    SetIfMissing {
        path: Path,
        value: Value,
        origin: Option<Origin>,
    },
    /// Remove the addressed node.
    Unset { path: Path, origin: Option<Origin> },
    /// Splice items into an array relative to the addressed element.
    Insert {
        path: Path,
        position: InsertPosition,
        items: Vec<Value>,
        origin: Option<Origin>,
    },
    /// Add to a numeric leaf.
    Inc {
        path: Path,
        value: Number,
        origin: Option<Origin>,
    },
    /// Subtract from a numeric leaf.
    Dec {
        path: Path,
        value: Number,
        origin: Option<Origin>,
    },
    /// Apply a serialized character-diff program to a string leaf.
    DiffMatchPatch {
        path: Path,
        value: String,
        origin: Option<Origin>,
    },
}

impl Patch {
    /// Returns the wire name of the operation.
    pub fn type_name(&self) -> &'static str {
        match self {
            Patch::Set { .. } => "set",
            Patch::SetIfMissing { .. } => "setIfMissing",
            Patch::Unset { .. } => "unset",
            Patch::Insert { .. } => "insert",
            Patch::Inc { .. } => "inc",
            Patch::Dec { .. } => "dec",
            Patch::DiffMatchPatch { .. } => "diffMatchPatch",
        }
    }

    /// Returns the target path of the patch.
    pub fn path(&self) -> &Path {
        match self {
            Patch::Set { path, .. } => path,
            Patch::SetIfMissing { path, .. } => path,
            Patch::Unset { path, .. } => path,
            Patch::Insert { path, .. } => path,
            Patch::Inc { path, .. } => path,
            Patch::Dec { path, .. } => path,
            Patch::DiffMatchPatch { path, .. } => path,
        }
    }

    pub fn origin(&self) -> Option<Origin> {
        match self {
            Patch::Set { origin, .. } => *origin,
            Patch::SetIfMissing { origin, .. } => *origin,
            Patch::Unset { origin, .. } => *origin,
            Patch::Insert { origin, .. } => *origin,
            Patch::Inc { origin, .. } => *origin,
            Patch::Dec { origin, .. } => *origin,
            Patch::DiffMatchPatch { origin, .. } => *origin,
        }
    }

    /// Rebuild the patch with the given origin tag.
    pub fn with_origin(mut self, new_origin: Origin) -> Patch {
        match &mut self {
            Patch::Set { origin, .. } => *origin = Some(new_origin),
            Patch::SetIfMissing { origin, .. } => *origin = Some(new_origin),
            Patch::Unset { origin, .. } => *origin = Some(new_origin),
            Patch::Insert { origin, .. } => *origin = Some(new_origin),
            Patch::Inc { origin, .. } => *origin = Some(new_origin),
            Patch::Dec { origin, .. } => *origin = Some(new_origin),
            Patch::DiffMatchPatch { origin, .. } => *origin = Some(new_origin),
        }
        self
    }

    // ── Constructors ──────────────────────────────────────────────────────

    pub fn set(path: Path, value: Value) -> Patch {
        Patch::Set {
            path,
            value,
            origin: None,
        }
    }

    pub fn set_if_missing(path: Path, value: Value) -> Patch {
        Patch::SetIfMissing {
            path,
            value,
            origin: None,
        }
    }

    pub fn unset(path: Path) -> Patch {
        Patch::Unset { path, origin: None }
    }

    pub fn insert(path: Path, position: InsertPosition, items: Vec<Value>) -> Patch {
        Patch::Insert {
            path,
            position,
            items,
            origin: None,
        }
    }

    pub fn inc(path: Path, value: Number) -> Patch {
        Patch::Inc {
            path,
            value,
            origin: None,
        }
    }

    pub fn dec(path: Path, value: Number) -> Patch {
        Patch::Dec {
            path,
            value,
            origin: None,
        }
    }

    pub fn diff_match_patch(path: Path, program: String) -> Patch {
        Patch::DiffMatchPatch {
            path,
            value: program,
            origin: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names_match_wire_format() {
        assert_eq!(Patch::set(vec![], json!(1)).type_name(), "set");
        assert_eq!(
            Patch::set_if_missing(vec![], json!(1)).type_name(),
            "setIfMissing"
        );
        assert_eq!(Patch::unset(vec![]).type_name(), "unset");
        assert_eq!(
            Patch::diff_match_patch(vec![], String::new()).type_name(),
            "diffMatchPatch"
        );
    }

    #[test]
    fn with_origin_tags_any_variant() {
        let p = Patch::unset(vec![PathSegment::Field("title".into())]);
        assert_eq!(p.origin(), None);
        let p = p.with_origin(Origin::Local);
        assert_eq!(p.origin(), Some(Origin::Local));
        assert_eq!(p.path(), &vec![PathSegment::Field("title".into())]);
    }
}
