use thiserror::Error;

/// Failures while parsing or applying a patch document.
///
/// Line numbers in the parse variants are 1-based positions inside the
/// patch text; `hunk` is the 1-based index of the offending hunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("malformed hunk header at patch line {line}: {text:?}")]
    MalformedHunkHeader { line: usize, text: String },

    #[error("unexpected line in hunk body at patch line {line}: {text:?}")]
    UnexpectedLine { line: usize, text: String },

    #[error(
        "hunk at patch line {line} declares -{expected_old}/+{expected_new} lines \
         but contains -{found_old}/+{found_new}"
    )]
    HunkLengthMismatch {
        line: usize,
        expected_old: usize,
        found_old: usize,
        expected_new: usize,
        found_new: usize,
    },

    #[error(
        "hunk {hunk} starts at line {start}, outside the valid range \
         (cursor {cursor}, input has {line_count} lines)"
    )]
    BadLineNumber {
        hunk: usize,
        start: usize,
        cursor: usize,
        line_count: usize,
    },

    #[error("hunk {hunk} does not match input line {line}: expected {expected:?}, found {found:?}")]
    ContextMismatch {
        hunk: usize,
        line: usize,
        expected: String,
        found: Option<String>,
    },
}
