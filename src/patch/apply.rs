use super::errors::PatchError;
use super::hunk::{split_lines, Hunk, LineKind, Patch};

/// Which side of the patch the input text represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Input is the old text; produce the new text.
    #[default]
    Forward,
    /// Input is the new text; reconstruct the old text.
    Revert,
}

impl Direction {
    /// Hunk lines this direction writes without consuming input.
    fn inserted(self) -> LineKind {
        match self {
            Direction::Forward => LineKind::Added,
            Direction::Revert => LineKind::Removed,
        }
    }

    /// Header range locating the hunk inside the input text.
    fn input_range(self, hunk: &Hunk) -> (usize, usize) {
        match self {
            Direction::Forward => (hunk.old_start, hunk.old_len),
            Direction::Revert => (hunk.new_start, hunk.new_len),
        }
    }
}

/// Apply `patch` to `text`, returning the reconstructed body.
///
/// The result is assembled in a fresh buffer; any error leaves nothing
/// half-applied. Context and consumed lines must match the input exactly.
pub fn apply_patch(text: &str, patch: &Patch, direction: Direction) -> Result<String, PatchError> {
    let input = split_lines(text);
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for (index, hunk) in patch.hunks.iter().enumerate() {
        let (start, len) = direction.input_range(hunk);
        let target = hunk_offset(start, len)
            .filter(|target| *target >= cursor && *target <= input.len())
            .ok_or(PatchError::BadLineNumber {
                hunk: index + 1,
                start,
                cursor,
                line_count: input.len(),
            })?;

        output.extend(input[cursor..target].iter().copied());
        cursor = target;

        for line in &hunk.lines {
            if line.kind == direction.inserted() {
                output.push_str(&line.text);
                continue;
            }

            let found = input.get(cursor).copied();
            if found != Some(line.text.as_str()) {
                return Err(PatchError::ContextMismatch {
                    hunk: index + 1,
                    line: cursor + 1,
                    expected: line.text.clone(),
                    found: found.map(str::to_string),
                });
            }
            if line.kind == LineKind::Context {
                output.push_str(&line.text);
            }
            cursor += 1;
        }
    }

    output.extend(input[cursor..].iter().copied());
    Ok(output)
}

/// Parse `patch` and apply it in one step.
pub fn apply_patch_str(text: &str, patch: &str, direction: Direction) -> Result<String, PatchError> {
    apply_patch(text, &Patch::parse(patch)?, direction)
}

/// Zero-based input line where a hunk begins.
///
/// A zero-length range names the line before the change, so it starts one
/// line later; a non-empty range can never start at line 0.
fn hunk_offset(start: usize, len: usize) -> Option<usize> {
    if len == 0 {
        Some(start)
    } else {
        start.checked_sub(1)
    }
}
