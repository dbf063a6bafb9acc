use super::download;
use super::errors::SourceError;
use super::{keyed, FileSource, SourceKind};
use crate::store;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A single file downloaded verbatim from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlSource {
    pub url: String,
    #[serde(default)]
    pub dir: PathBuf,
}

impl UrlSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dir: PathBuf::new(),
        }
    }
}

impl SourceKind for UrlSource {
    const KIND: &'static str = "url";
}

impl FileSource for UrlSource {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn key(&self) -> String {
        keyed(Self::KIND, &self.url, &self.dir)
    }

    fn relative_dir(&self) -> &Path {
        &self.dir
    }

    fn fetch(&self, destination: &Path) -> Result<(), SourceError> {
        let download = download::get(&self.url)?;
        store::write_atomic(&destination.join(&download.filename), &download.bytes)?;
        Ok(())
    }
}
