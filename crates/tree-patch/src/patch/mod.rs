//! Patch model and application.
//!
//! [`types`] defines the operation set, [`apply`] the pure recursive engine,
//! and [`codec`] the JSON wire shape.

pub mod apply;
pub mod codec;
pub mod types;

pub use apply::{apply, apply_all, find_target_index};
pub use codec::{batch_from_json, batch_to_json, from_json, path_from_json, to_json, CodecError};
pub use types::{ApplyError, InsertPosition, Origin, Patch, Path, PathSegment};
