//! Character-level text diff and fuzzy patch application.
//!
//! This crate implements the text side of collaborative patching:
//!
//! - [`diff`] computes a character-level edit script between two strings
//!   (Myers O(ND) difference algorithm);
//! - [`make`] turns an edit script into context-anchored patch blocks;
//! - [`stringify`] / [`parse`] convert patch blocks to and from the
//!   serialized `@@ -s,l +s,l @@` diff-program format;
//! - [`apply`] plays a diff program against a string, tolerating positional
//!   drift via Bitap fuzzy context matching.
//!
//! All positions and lengths are in Unicode scalar values (Rust `char`s),
//! never bytes.
//!
//! # Example
//!
//! ```
//! use tree_patch_dmp::{make, stringify, apply_text_patch};
//!
//! let program = stringify(&make("the quick fox", "the slow fox"));
//! assert_eq!(apply_text_patch("the quick fox", &program).unwrap(), "the slow fox");
//! ```

pub mod bitap;
pub mod diff;
pub mod patch;

pub use diff::{diff, invert, source_text, target_text, Diff, DiffOp};
pub use patch::{apply, apply_text_patch, make, parse, stringify, PatchBlock, TextPatchError};
