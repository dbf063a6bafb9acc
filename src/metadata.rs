//! Project metadata: declared sources, path filters and tree locations.

use crate::source::{download, DecodeError, SourceError, SourceRegistry, SourceSet};
use crate::workspace::{Locations, PathFilter, PatternError, Workspace, WorkspaceLayout};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_METADATA_FILE: &str = "project_metadata.json";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read project metadata from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download project metadata from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: SourceError,
    },

    #[error("project metadata downloaded from {url} is not valid UTF-8")]
    NotUtf8 { url: String },

    #[error("failed to parse project metadata{}: {source}", in_file(.path))]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid source #{index} in project metadata{}: {source}", in_file(.path))]
    Source {
        path: Option<PathBuf>,
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("bad filter in project metadata{}: {source}", in_file(.path))]
    Pattern {
        path: Option<PathBuf>,
        #[source]
        source: PatternError,
    },
}

fn in_file(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

impl MetadataError {
    fn with_path(self, file: &Path) -> Self {
        let file = Some(file.to_path_buf());
        match self {
            MetadataError::Json { path: None, source } => MetadataError::Json { path: file, source },
            MetadataError::Source {
                path: None,
                index,
                source,
            } => MetadataError::Source {
                path: file,
                index,
                source,
            },
            MetadataError::Pattern { path: None, source } => {
                MetadataError::Pattern { path: file, source }
            }
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    files: Vec<Value>,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    overwrite: Vec<String>,
    #[serde(default)]
    location: Locations,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A decoded metadata document. Every source is decoded before any I/O.
#[derive(Debug)]
pub struct ProjectMetadata {
    pub sources: SourceSet,
    pub filter: PathFilter,
    pub locations: Locations,
    /// Top-level keys this tool does not interpret, kept for other tooling.
    pub extra: Map<String, Value>,
}

impl ProjectMetadata {
    pub fn layout(&self, root: &Path) -> WorkspaceLayout {
        WorkspaceLayout::from_root(root, &self.locations)
    }

    pub fn workspace(&self, root: &Path) -> Workspace {
        Workspace::new(self.layout(root)).with_filter(self.filter.clone())
    }
}

pub fn load_from_str(input: &str, registry: &SourceRegistry) -> Result<ProjectMetadata, MetadataError> {
    let raw: RawMetadata =
        serde_json::from_str(input).map_err(|source| MetadataError::Json { path: None, source })?;

    let sources = raw
        .files
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            registry.decode(entry).map_err(|source| MetadataError::Source {
                path: None,
                index,
                source,
            })
        })
        .collect::<Result<SourceSet, _>>()?;

    let filter = PathFilter::new(&raw.ignore, &raw.overwrite)
        .map_err(|source| MetadataError::Pattern { path: None, source })?;

    Ok(ProjectMetadata {
        sources,
        filter,
        locations: raw.location,
        extra: raw.extra,
    })
}

pub fn load_from_path(
    path: impl AsRef<Path>,
    registry: &SourceRegistry,
) -> Result<ProjectMetadata, MetadataError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents, registry).map_err(|error| error.with_path(path))
}

/// Raw metadata text from a local path or an `http(s)` URL.
///
/// Relative paths resolve against `root`.
pub fn read_document(location: &str, root: &Path) -> Result<String, MetadataError> {
    if is_url(location) {
        let body = download::get(location).map_err(|source| MetadataError::Download {
            url: location.to_string(),
            source,
        })?;
        return String::from_utf8(body.bytes).map_err(|_| MetadataError::NotUtf8 {
            url: location.to_string(),
        });
    }
    let path = root.join(location);
    fs::read_to_string(&path).map_err(|source| MetadataError::Io { path, source })
}

fn is_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
