//! Typed model of a unified-diff patch document and its text form.

use super::errors::PatchError;
use std::fmt;
use std::str::FromStr;

/// Marker emitted after a hunk line whose source line has no terminator.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Split a text body into lines, each keeping its `\n` terminator.
///
/// Only the final line may lack a terminator.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Unchanged line, prefixed with a single space.
    Context,
    /// Line present only in the old text, prefixed with `-`.
    Removed,
    /// Line present only in the new text, prefixed with `+`.
    Added,
}

impl LineKind {
    pub fn prefix(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Removed => '-',
            LineKind::Added => '+',
        }
    }

    fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            ' ' => Some(LineKind::Context),
            '-' => Some(LineKind::Removed),
            '+' => Some(LineKind::Added),
            _ => None,
        }
    }
}

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    /// Line content including its terminator, if the source line had one.
    pub text: String,
}

impl HunkLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn has_newline(&self) -> bool {
        self.text.ends_with('\n')
    }
}

/// A contiguous old-range/new-range substitution.
///
/// Starts are stored exactly as written in the `@@` header: 1-based, except
/// that an empty range names the line *before* the insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Number of body lines that belong to the old text.
    pub fn old_line_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.kind != LineKind::Added)
            .count()
    }

    /// Number of body lines that belong to the new text.
    pub fn new_line_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.kind != LineKind::Removed)
            .count()
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            HeaderRange(self.old_start, self.old_len),
            HeaderRange(self.new_start, self.new_len)
        )?;
        for line in &self.lines {
            write!(f, "{}{}", line.kind.prefix(), line.text)?;
            if !line.has_newline() {
                write!(f, "\n{NO_NEWLINE_MARKER}\n")?;
            }
        }
        Ok(())
    }
}

/// Range as it appears in a hunk header; the length is omitted when it is 1.
struct HeaderRange(usize, usize);

impl fmt::Display for HeaderRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 == 1 {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{},{}", self.0, self.1)
        }
    }
}

/// The optional `---`/`+++` file header.
///
/// Names are informational; line breaks and tabs in them are written as
/// `\n`, `\r` and `\t` so the header stays on one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchHeader {
    pub old_name: String,
    pub new_name: String,
}

impl PatchHeader {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = escape_name(name.as_ref());
        Self {
            old_name: name.clone(),
            new_name: name,
        }
    }
}

fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A parsed patch document: an optional header plus ordered hunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use = "Patch does nothing until it is applied or written"]
pub struct Patch {
    pub header: Option<PatchHeader>,
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// A document without hunks describes no change and is never persisted.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Display name carried by the header, if any.
    pub fn name(&self) -> Option<&str> {
        self.header.as_ref().map(|header| header.new_name.as_str())
    }

    pub fn parse(input: &str) -> Result<Self, PatchError> {
        input.parse()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        if let Some(header) = &self.header {
            writeln!(f, "--- {}", escape_name(&header.old_name))?;
            writeln!(f, "+++ {}", escape_name(&header.new_name))?;
        }
        for hunk in &self.hunks {
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}

impl FromStr for Patch {
    type Err = PatchError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let lines = split_lines(input);
        let mut idx = 0;

        let mut old_name = None;
        let mut new_name = None;
        while idx < lines.len() {
            if let Some(rest) = lines[idx].strip_prefix("---") {
                old_name = Some(header_name(rest));
            } else if let Some(rest) = lines[idx].strip_prefix("+++") {
                new_name = Some(header_name(rest));
            } else {
                break;
            }
            idx += 1;
        }
        let header = match (old_name, new_name) {
            (None, None) => None,
            (old, new) => Some(PatchHeader {
                old_name: old.unwrap_or_default(),
                new_name: new.unwrap_or_default(),
            }),
        };

        let mut hunks = Vec::new();
        while idx < lines.len() {
            let header_line = idx + 1;
            let ((old_start, old_len), (new_start, new_len)) = parse_hunk_header(lines[idx])
                .ok_or_else(|| PatchError::MalformedHunkHeader {
                    line: header_line,
                    text: lines[idx].trim_end().to_string(),
                })?;
            idx += 1;

            let mut body = Vec::new();
            while idx < lines.len() && !lines[idx].starts_with('@') {
                let line_no = idx + 1;
                let mut raw = lines[idx];
                idx += 1;
                if idx < lines.len() && lines[idx].starts_with('\\') {
                    raw = raw.strip_suffix('\n').unwrap_or(raw);
                    idx += 1;
                }
                body.push(parse_body_line(raw).ok_or_else(|| PatchError::UnexpectedLine {
                    line: line_no,
                    text: raw.trim_end().to_string(),
                })?);
            }

            let hunk = Hunk {
                old_start,
                old_len,
                new_start,
                new_len,
                lines: body,
            };
            let (found_old, found_new) = (hunk.old_line_count(), hunk.new_line_count());
            if found_old != old_len || found_new != new_len {
                return Err(PatchError::HunkLengthMismatch {
                    line: header_line,
                    expected_old: old_len,
                    found_old,
                    expected_new: new_len,
                    found_new,
                });
            }
            hunks.push(hunk);
        }

        Ok(Patch { header, hunks })
    }
}

/// Name from a `---`/`+++` line, dropping any tab-separated timestamp.
fn header_name(rest: &str) -> String {
    let rest = rest.trim_end_matches(['\n', '\r']);
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    rest.split('\t').next().unwrap_or_default().to_string()
}

type HeaderRanges = ((usize, usize), (usize, usize));

/// Parse `@@ -a[,b] +c[,d] @@`, optionally followed by a section heading.
fn parse_hunk_header(line: &str) -> Option<HeaderRanges> {
    let line = line.trim_end_matches(['\n', '\r']);
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, tail) = rest.split_once(" @@")?;
    if !(tail.is_empty() || tail.starts_with(' ')) {
        return None;
    }
    let (old, new) = ranges.split_once(" +")?;
    Some((parse_range(old)?, parse_range(new)?))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((parse_number(start)?, parse_number(len)?)),
        None => Some((parse_number(range)?, 1)),
    }
}

fn parse_number(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_body_line(raw: &str) -> Option<HunkLine> {
    // Editors commonly strip the single space from blank context lines.
    if raw == "\n" || raw == "\r\n" {
        return Some(HunkLine::new(LineKind::Context, raw));
    }
    let mut chars = raw.chars();
    let kind = LineKind::from_prefix(chars.next()?)?;
    Some(HunkLine::new(kind, chars.as_str()))
}
