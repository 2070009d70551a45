//! Collaborative-editing patches over JSON document trees.
//!
//! A [`Patch`] addresses a node with a [`Path`] of field names, array
//! indices, and `_key` selectors, and carries one of a closed set of
//! operations: `set`, `setIfMissing`, `unset`, `insert`, `inc`/`dec`, and
//! `diffMatchPatch` for character-level string edits. [`apply`] is a pure
//! function — the input document is never mutated.
//!
//! ```
//! use serde_json::json;
//! use tree_patch::{apply, Patch};
//! use tree_patch_path::parse_path;
//!
//! let doc = json!({"title": "helo"});
//! let patch = Patch::set(parse_path("title")?, json!("hello"));
//! let next = apply(Some(&doc), &patch)?;
//! assert_eq!(next, Some(json!({"title": "hello"})));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`ConflictArbiter`] and [`SyncDriver`] layer optimistic concurrency on
//! top: local patches queue until flushed, and a remote patch on the same
//! node or an ancestor silently discards the stale local one.

pub mod arbiter;
pub mod patch;
pub mod sync;

pub use arbiter::ConflictArbiter;
pub use patch::{
    apply, apply_all, batch_from_json, batch_to_json, from_json, to_json, ApplyError,
    CodecError, InsertPosition, Origin, Patch, Path, PathSegment,
};
pub use sync::{RemoteUpdate, SyncDriver};
