//! The recursive patch application engine.
//!
//! `apply` is a pure function from `(document, patch)` to a new document:
//! inputs are borrowed and never mutated, so earlier snapshots stay valid
//! after every call. Absence is modeled with `Option` — `None` is the absent
//! sentinel, distinct from an explicit JSON `null`.
//!
//! Dispatch is on the runtime type of the current value. Each handler either
//! operates on the value directly (empty path) or consumes one path segment
//! and recurses. Two failure modes are kept strictly apart: an unresolvable
//! selector (missing `_key`, index out of range) returns the value unchanged,
//! while a type mismatch raises an [`ApplyError`].

use serde_json::{Map, Number, Value};

use tree_patch_dmp::apply_text_patch;

use super::types::{ApplyError, InsertPosition, Patch, PathSegment};

// ── Entry points ──────────────────────────────────────────────────────────

/// Apply a single patch to a value, producing the new value.
///
/// `None` stands for an absent document/node on both sides.
pub fn apply(value: Option<&Value>, patch: &Patch) -> Result<Option<Value>, ApplyError> {
    apply_at(value, patch.path(), patch)
}

/// Fold a patch sequence left to right, each patch seeing the previous
/// output. The first fatal error aborts the fold, so a caller that keeps its
/// original document gets all-or-nothing batch semantics.
pub fn apply_all(
    value: Option<&Value>,
    patches: &[Patch],
) -> Result<Option<Value>, ApplyError> {
    let mut current = value.cloned();
    for patch in patches {
        current = apply(current.as_ref(), patch)?;
    }
    Ok(current)
}

fn apply_at(
    value: Option<&Value>,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    match value {
        Some(Value::Array(items)) => apply_array(items, path, patch),
        Some(Value::String(current)) => apply_string(current, path, patch),
        Some(Value::Object(map)) => apply_object(map, path, patch),
        Some(Value::Number(current)) => apply_number(current, path, patch),
        other => apply_primitive(other, path, patch),
    }
}

// ── Selector resolution ───────────────────────────────────────────────────

/// Resolve a path segment against an array.
///
/// Numeric indices are used directly (the caller range-checks). A keyed
/// selector matches the first element whose `_key` field equals the key;
/// no match, or a field-name segment, resolves to nothing.
pub fn find_target_index(items: &[Value], segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Index(index) => Some(*index),
        PathSegment::Key(key) => items
            .iter()
            .position(|item| item.get("_key").and_then(Value::as_str) == Some(key)),
        PathSegment::Field(_) => None,
    }
}

// ── Per-type handlers ─────────────────────────────────────────────────────

fn apply_array(
    items: &[Value],
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    let unchanged = || Ok(Some(Value::Array(items.to_vec())));

    let Some((head, tail)) = path.split_first() else {
        return match patch {
            Patch::Set { value, .. } => match value {
                Value::Array(_) => Ok(Some(value.clone())),
                other => Err(mismatch("array", other)),
            },
            Patch::SetIfMissing { value, .. } => match value {
                Value::Array(_) => unchanged(),
                other => Err(mismatch("array", other)),
            },
            Patch::Unset { .. } => Ok(None),
            other => Err(unsupported(other, "array")),
        };
    };

    let Some(index) = find_target_index(items, head) else {
        // Unmatched selector: concurrent edits race with deletions, so this
        // is a silent no-op rather than an error.
        return unchanged();
    };

    if tail.is_empty() {
        match patch {
            Patch::Insert {
                position,
                items: new_items,
                ..
            } => {
                let mut out = items.to_vec();
                match position {
                    InsertPosition::Before => {
                        let at = index.min(out.len());
                        out.splice(at..at, new_items.iter().cloned());
                    }
                    InsertPosition::After => {
                        let at = (index + 1).min(out.len());
                        out.splice(at..at, new_items.iter().cloned());
                    }
                    InsertPosition::Replace => {
                        let at = index.min(out.len());
                        let end = (index + 1).min(out.len());
                        out.splice(at..end, new_items.iter().cloned());
                    }
                }
                return Ok(Some(Value::Array(out)));
            }
            Patch::Unset { .. } => {
                if index >= items.len() {
                    return unchanged();
                }
                let mut out = items.to_vec();
                out.remove(index);
                return Ok(Some(Value::Array(out)));
            }
            _ => {}
        }
    }

    if index >= items.len() {
        return unchanged();
    }
    let element = apply_at(Some(&items[index]), tail, patch)?;
    let mut out = items.to_vec();
    match element {
        Some(value) => out[index] = value,
        None => {
            out.remove(index);
        }
    }
    Ok(Some(Value::Array(out)))
}

fn apply_string(
    current: &str,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    if !path.is_empty() {
        return Err(ApplyError::DeepOnLeaf { kind: "string" });
    }
    match patch {
        Patch::DiffMatchPatch { value, .. } => {
            Ok(Some(Value::String(apply_text_patch(current, value)?)))
        }
        Patch::Set { value, .. } => match value {
            Value::Array(_) | Value::Object(_) => Err(mismatch("string", value)),
            other => Ok(Some(other.clone())),
        },
        Patch::SetIfMissing { .. } => Ok(Some(Value::String(current.to_string()))),
        Patch::Unset { .. } => Ok(None),
        other => Err(unsupported(other, "string")),
    }
}

fn apply_object(
    map: &Map<String, Value>,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    let Some((head, tail)) = path.split_first() else {
        return match patch {
            Patch::Set { value, .. } => match value {
                Value::Object(_) => Ok(Some(value.clone())),
                other => Err(mismatch("object", other)),
            },
            Patch::SetIfMissing { value, .. } => match value {
                Value::Object(_) => Ok(Some(Value::Object(map.clone()))),
                other => Err(mismatch("object", other)),
            },
            Patch::Unset { .. } => Ok(None),
            other => Err(unsupported(other, "object")),
        };
    };

    let PathSegment::Field(name) = head else {
        return Err(ApplyError::InvalidObjectSegment);
    };

    if tail.is_empty() {
        if let Patch::Unset { .. } = patch {
            let mut out = map.clone();
            out.shift_remove(name);
            return Ok(Some(Value::Object(out)));
        }
    }

    let member = apply_at(map.get(name), tail, patch)?;
    let mut out = map.clone();
    match member {
        Some(value) => {
            out.insert(name.clone(), value);
        }
        None => {
            out.shift_remove(name);
        }
    }
    Ok(Some(Value::Object(out)))
}

fn apply_number(
    current: &Number,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    if !path.is_empty() {
        return Err(ApplyError::DeepOnLeaf { kind: "number" });
    }
    match patch {
        Patch::Set { value, .. } => match value {
            Value::Array(_) | Value::Object(_) => Err(mismatch("number", value)),
            other => Ok(Some(other.clone())),
        },
        Patch::SetIfMissing { .. } => Ok(Some(Value::Number(current.clone()))),
        Patch::Unset { .. } => Ok(None),
        Patch::Inc { value, .. } => Ok(Some(Value::Number(arithmetic(current, value, 1)?))),
        Patch::Dec { value, .. } => Ok(Some(Value::Number(arithmetic(current, value, -1)?))),
        other => Err(unsupported(other, "number")),
    }
}

/// Anything without addressable children that is not a number or string:
/// absent, explicit null, or a boolean.
fn apply_primitive(
    value: Option<&Value>,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<Option<Value>, ApplyError> {
    if !path.is_empty() {
        return Err(ApplyError::DeepOnLeaf { kind: "primitive" });
    }
    match patch {
        Patch::Set {
            value: new_value, ..
        } => Ok(Some(new_value.clone())),
        Patch::SetIfMissing {
            value: new_value, ..
        } => match value {
            // Only true absence is "missing": an explicit null is a present
            // value and blocks setIfMissing.
            None => Ok(Some(new_value.clone())),
            Some(current) => Ok(Some(current.clone())),
        },
        Patch::Unset { .. } => Ok(None),
        other => Err(unsupported(other, kind_of_opt(value))),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn kind_of_opt(value: Option<&Value>) -> &'static str {
    value.map(kind_of).unwrap_or("absent")
}

fn mismatch(kind: &'static str, found: &Value) -> ApplyError {
    ApplyError::TypeMismatch {
        kind,
        found: kind_of(found),
    }
}

fn unsupported(patch: &Patch, kind: &'static str) -> ApplyError {
    ApplyError::UnsupportedOp {
        op: patch.type_name(),
        kind,
    }
}

/// Integer arithmetic when both operands are integral, f64 otherwise.
fn arithmetic(current: &Number, delta: &Number, sign: i64) -> Result<Number, ApplyError> {
    if let (Some(a), Some(b)) = (current.as_i64(), delta.as_i64()) {
        let result = if sign >= 0 {
            a.checked_add(b)
        } else {
            a.checked_sub(b)
        };
        if let Some(r) = result {
            return Ok(Number::from(r));
        }
    }
    let a = current.as_f64().unwrap_or(f64::NAN);
    let b = delta.as_f64().unwrap_or(f64::NAN);
    let r = if sign >= 0 { a + b } else { a - b };
    Number::from_f64(r).ok_or(ApplyError::NonFinite)
}

// ── Tests ─────────────────────────────────────────────────────────────────
