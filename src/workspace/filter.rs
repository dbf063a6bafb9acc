use glob::Pattern;
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// Ignore and overwrite patterns applied while deriving patches.
///
/// Patterns match `/`-separated relative paths, and `*` also crosses
/// directory separators. Hidden entries (any component starting with `.`)
/// are left out of both directions unless [`PathFilter::with_hidden`] opts
/// them in.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    ignore: Vec<Pattern>,
    overwrite: Vec<Pattern>,
    include_hidden: bool,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(ignore: &[S], overwrite: &[S]) -> Result<Self, PatternError> {
        Ok(Self {
            ignore: compile(ignore)?,
            overwrite: compile(overwrite)?,
            include_hidden: false,
        })
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Whether a tree walk should visit `relative` at all.
    pub fn walks(&self, relative: &Path) -> bool {
        self.include_hidden || !is_hidden(relative)
    }

    /// Files left out of the patch and new-file trees entirely.
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.iter().any(|pattern| pattern.matches(relative))
    }

    /// Files copied verbatim to the new-file tree even with a clean counterpart.
    pub fn is_overwritten(&self, relative: &str) -> bool {
        self.overwrite.iter().any(|pattern| pattern.matches(relative))
    }
}

/// True when any component of `relative` is a dotfile or dot-directory.
pub fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PatternError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}
