use super::download;
use super::errors::SourceError;
use super::{keyed, FileSource, SourceKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// All files of an Open Science Framework project, fetched as one archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OsfSource {
    /// Five character project identifier.
    pub id: String,
    #[serde(default)]
    pub dir: PathBuf,
}

impl OsfSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dir: PathBuf::new(),
        }
    }

    pub fn archive_url(&self) -> String {
        format!(
            "https://files.osf.io/v1/resources/{}/providers/osfstorage/?zip=",
            self.id
        )
    }
}

impl SourceKind for OsfSource {
    const KIND: &'static str = "osf";
}

impl FileSource for OsfSource {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn key(&self) -> String {
        keyed(Self::KIND, &self.id, &self.dir)
    }

    fn relative_dir(&self) -> &Path {
        &self.dir
    }

    fn fetch(&self, destination: &Path) -> Result<(), SourceError> {
        let url = self.archive_url();
        let download = download::get(&url)?;
        download::extract_zip(&url, download.bytes, destination)
    }
}
