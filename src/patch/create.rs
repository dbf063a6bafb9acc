use super::hunk::{split_lines, Hunk, HunkLine, LineKind, Patch, PatchHeader};
use similar::{capture_diff_slices, group_diff_ops, Algorithm, DiffOp, DiffTag};

/// Unchanged lines kept around each change, as in classic `diff -u`.
pub const CONTEXT_RADIUS: usize = 3;

/// Build a patch turning `old` into `new`.
///
/// Lines are compared including their terminators, so a final line that
/// gains or loses its newline shows up as a change. Identical inputs yield
/// an empty patch.
pub fn create_patch(old: &str, new: &str, name: &str) -> Patch {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let ops = capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines);
    let mut offset: isize = 0;
    let mut hunks = Vec::new();
    for group in group_diff_ops(ops, CONTEXT_RADIUS) {
        if let Some(hunk) = build_hunk(&group, &old_lines, &new_lines, offset) {
            offset += hunk.new_len as isize - hunk.old_len as isize;
            hunks.push(hunk);
        }
    }

    Patch {
        header: Some(PatchHeader::new(name)),
        hunks,
    }
}

// Ranges come from the body and the running line offset, not from the op
// indices: Myers may emit ops whose new-side indices are not monotonic.
fn build_hunk(
    group: &[DiffOp],
    old_lines: &[&str],
    new_lines: &[&str],
    offset: isize,
) -> Option<Hunk> {
    if group.iter().all(|op| op.tag() == DiffTag::Equal) {
        return None;
    }
    let old_begin = group.first()?.old_range().start;

    let mut lines = Vec::new();
    for op in group {
        let (tag, old, new) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push_lines(&mut lines, LineKind::Context, &old_lines[old]),
            DiffTag::Delete => push_lines(&mut lines, LineKind::Removed, &old_lines[old]),
            DiffTag::Insert => push_lines(&mut lines, LineKind::Added, &new_lines[new]),
            DiffTag::Replace => {
                push_lines(&mut lines, LineKind::Removed, &old_lines[old]);
                push_lines(&mut lines, LineKind::Added, &new_lines[new]);
            }
        }
    }

    let mut hunk = Hunk {
        old_start: 0,
        old_len: 0,
        new_start: 0,
        new_len: 0,
        lines,
    };
    hunk.old_len = hunk.old_line_count();
    hunk.new_len = hunk.new_line_count();
    let new_begin = old_begin.checked_add_signed(offset)?;
    hunk.old_start = header_start(old_begin, hunk.old_len);
    hunk.new_start = header_start(new_begin, hunk.new_len);
    Some(hunk)
}

fn push_lines(lines: &mut Vec<HunkLine>, kind: LineKind, source: &[&str]) {
    lines.extend(source.iter().map(|text| HunkLine::new(kind, *text)));
}

// Empty ranges are reported as the line before the insertion point.
fn header_start(begin: usize, len: usize) -> usize {
    if len == 0 {
        begin
    } else {
        begin + 1
    }
}
