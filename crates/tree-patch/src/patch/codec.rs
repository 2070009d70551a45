//! JSON wire codec for patches.
//!
//! The serialized shape is a flat object:
//!
//! ```json
//! { "type": "set",
//!   "path": ["children", {"_key": "b"}, 0],
//!   "value": {"text": "hi"},
//!   "origin": "local" }
//! ```
//!
//! `path` elements are strings (object fields), numbers (array indices) or
//! `{"_key": "..."}` selector objects. `position` and `items` appear only on
//! `insert`; `value` carries the payload of the other parameterized types.
//! `origin` is optional in both directions.

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::types::{InsertPosition, Origin, Patch, Path, PathSegment};

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("patch must be a JSON object")]
    NotAnObject,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unknown patch type: {0}")]
    UnknownType(String),
    #[error("invalid path element at position {0}")]
    InvalidPathElement(usize),
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

// ── Encoding ──────────────────────────────────────────────────────────────

pub fn to_json(patch: &Patch) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(patch.type_name()));
    obj.insert("path".into(), path_to_json(patch.path()));
    match patch {
        Patch::Set { value, .. }
        | Patch::SetIfMissing { value, .. } => {
            obj.insert("value".into(), value.clone());
        }
        Patch::Unset { .. } => {}
        Patch::Insert {
            position, items, ..
        } => {
            obj.insert("position".into(), json!(position.as_str()));
            obj.insert("items".into(), Value::Array(items.clone()));
        }
        Patch::Inc { value, .. } | Patch::Dec { value, .. } => {
            obj.insert("value".into(), Value::Number(value.clone()));
        }
        Patch::DiffMatchPatch { value, .. } => {
            obj.insert("value".into(), json!(value));
        }
    }
    if let Some(origin) = patch.origin() {
        obj.insert("origin".into(), json!(origin.as_str()));
    }
    Value::Object(obj)
}

pub fn batch_to_json(patches: &[Patch]) -> Value {
    Value::Array(patches.iter().map(to_json).collect())
}

fn path_to_json(path: &[PathSegment]) -> Value {
    Value::Array(
        path.iter()
            .map(|segment| match segment {
                PathSegment::Index(i) => json!(i),
                PathSegment::Field(name) => json!(name),
                PathSegment::Key(key) => json!({"_key": key}),
            })
            .collect(),
    )
}

// ── Decoding ──────────────────────────────────────────────────────────────

pub fn from_json(value: &Value) -> Result<Patch, CodecError> {
    let obj = value.as_object().ok_or(CodecError::NotAnObject)?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingField("type"))?;
    let path = path_from_json(obj.get("path").ok_or(CodecError::MissingField("path"))?)?;
    let origin = match obj.get("origin") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(origin_from_str(s)?),
        Some(_) => return Err(CodecError::InvalidField("origin")),
    };

    let patch = match kind {
        "set" => Patch::Set {
            path,
            value: required(obj, "value")?.clone(),
            origin,
        },
        "setIfMissing" => Patch::SetIfMissing {
            path,
            value: required(obj, "value")?.clone(),
            origin,
        },
        "unset" => Patch::Unset { path, origin },
        "insert" => {
            let position = match required(obj, "position")?.as_str() {
                Some("before") => InsertPosition::Before,
                Some("after") => InsertPosition::After,
                Some("replace") => InsertPosition::Replace,
                _ => return Err(CodecError::InvalidField("position")),
            };
            let items = required(obj, "items")?
                .as_array()
                .ok_or(CodecError::InvalidField("items"))?
                .clone();
            Patch::Insert {
                path,
                position,
                items,
                origin,
            }
        }
        "inc" | "dec" => {
            let value = required(obj, "value")?
                .as_number()
                .ok_or(CodecError::InvalidField("value"))?
                .clone();
            if kind == "inc" {
                Patch::Inc { path, value, origin }
            } else {
                Patch::Dec { path, value, origin }
            }
        }
        "diffMatchPatch" => Patch::DiffMatchPatch {
            path,
            value: required(obj, "value")?
                .as_str()
                .ok_or(CodecError::InvalidField("value"))?
                .to_string(),
            origin,
        },
        other => return Err(CodecError::UnknownType(other.to_string())),
    };
    Ok(patch)
}

pub fn batch_from_json(value: &Value) -> Result<Vec<Patch>, CodecError> {
    value
        .as_array()
        .ok_or(CodecError::NotAnObject)?
        .iter()
        .map(from_json)
        .collect()
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a Value, CodecError> {
    obj.get(name).ok_or(CodecError::MissingField(name))
}

fn origin_from_str(s: &str) -> Result<Origin, CodecError> {
    match s {
        "local" => Ok(Origin::Local),
        "remote" => Ok(Origin::Remote),
        "internal" => Ok(Origin::Internal),
        _ => Err(CodecError::InvalidField("origin")),
    }
}

pub fn path_from_json(value: &Value) -> Result<Path, CodecError> {
    let elements = value.as_array().ok_or(CodecError::InvalidField("path"))?;
    elements
        .iter()
        .enumerate()
        .map(|(i, element)| match element {
            Value::String(name) => Ok(PathSegment::Field(name.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(|n| PathSegment::Index(n as usize))
                .ok_or(CodecError::InvalidPathElement(i)),
            Value::Object(map) => match map.get("_key").and_then(Value::as_str) {
                Some(key) if map.len() == 1 => Ok(PathSegment::Key(key.to_string())),
                _ => Err(CodecError::InvalidPathElement(i)),
            },
            _ => Err(CodecError::InvalidPathElement(i)),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    #[test]
    fn set_round_trip() {
        let wire = json!({
            "type": "set",
            "path": ["children", {"_key": "b"}, 0, "text"],
            "value": "hello",
            "origin": "remote",
        });
        let patch = from_json(&wire).unwrap();
        assert_eq!(
            patch,
            Patch::Set {
                path: vec![
                    PathSegment::Field("children".into()),
                    PathSegment::Key("b".into()),
                    PathSegment::Index(0),
                    PathSegment::Field("text".into()),
                ],
                value: json!("hello"),
                origin: Some(Origin::Remote),
            }
        );
        assert_eq!(to_json(&patch), wire);
    }

    #[test]
    fn insert_round_trip() {
        let wire = json!({
            "type": "insert",
            "path": [{"_key": "a"}],
            "position": "after",
            "items": [{"_key": "b"}],
        });
        let patch = from_json(&wire).unwrap();
        assert_eq!(to_json(&patch), wire);
    }

    #[test]
    fn unset_omits_value() {
        let patch = Patch::unset(vec![PathSegment::Field("a".into())]);
        assert_eq!(to_json(&patch), json!({"type": "unset", "path": ["a"]}));
    }

    #[test]
    fn inc_requires_numeric_value() {
        let wire = json!({"type": "inc", "path": ["count"], "value": "5"});
        assert_eq!(
            from_json(&wire).unwrap_err(),
            CodecError::InvalidField("value")
        );
        let wire = json!({"type": "inc", "path": ["count"], "value": 5});
        assert_eq!(
            from_json(&wire).unwrap(),
            Patch::inc(vec![PathSegment::Field("count".into())], Number::from(5))
        );
    }

    #[test]
    fn rejects_unknown_type_and_bad_paths() {
        assert_eq!(
            from_json(&json!({"type": "merge", "path": []})).unwrap_err(),
            CodecError::UnknownType("merge".into())
        );
        assert_eq!(
            from_json(&json!({"type": "unset", "path": [true]})).unwrap_err(),
            CodecError::InvalidPathElement(0)
        );
        assert_eq!(
            from_json(&json!({"type": "unset", "path": [{"_key": "a", "extra": 1}]}))
                .unwrap_err(),
            CodecError::InvalidPathElement(0)
        );
        assert_eq!(from_json(&json!([])).unwrap_err(), CodecError::NotAnObject);
    }

    #[test]
    fn batch_round_trip() {
        let patches = vec![
            Patch::set(vec![], json!({"a": 1})),
            Patch::unset(vec![PathSegment::Field("a".into())]),
        ];
        let wire = batch_to_json(&patches);
        assert_eq!(batch_from_json(&wire).unwrap(), patches);
    }
}
