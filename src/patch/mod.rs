//! Line-oriented unified-diff codec.
//!
//! Pure text-to-text functions with no I/O: [`create_patch`] builds a
//! [`Patch`] from two text bodies, [`apply_patch`] applies one forward or
//! in reverse. Serialization goes through `Display`, parsing through
//! `FromStr`.

pub mod apply;
pub mod create;
pub mod errors;
pub mod hunk;

pub use apply::{apply_patch, apply_patch_str, Direction};
pub use create::{create_patch, CONTEXT_RADIUS};
pub use errors::PatchError;
pub use hunk::{split_lines, Hunk, HunkLine, LineKind, Patch, PatchHeader, NO_NEWLINE_MARKER};
