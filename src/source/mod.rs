//! Providers of the pristine project tree.
//!
//! Every declared source implements [`FileSource`]; metadata decoding goes
//! through a [`SourceRegistry`] so new kinds can be added without touching
//! the reconciler.

pub mod download;
pub mod errors;
pub mod git;
pub mod osf;
pub mod registry;
pub mod url;

pub use errors::{DecodeError, SourceError};
pub use git::{GitRef, GitSource};
pub use osf::OsfSource;
pub use registry::{decode_as, SourceDecoder, SourceRegistry};
pub use url::UrlSource;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Something that can place files into the clean tree.
pub trait FileSource: fmt::Debug {
    /// Registry tag of this source kind.
    fn kind(&self) -> &'static str;

    /// Stable identity used to remember that this source was fetched.
    fn key(&self) -> String;

    /// Directory, relative to the clean root, that receives the files.
    fn relative_dir(&self) -> &Path;

    /// Fetch into `destination`, which is the already-joined target directory.
    fn fetch(&self, destination: &Path) -> Result<(), SourceError>;
}

/// Compile-time tag for source types that decode straight from their fields.
pub trait SourceKind {
    const KIND: &'static str;
}

/// Append the relative directory to a key when one is set.
pub(crate) fn keyed(kind: &str, identity: &str, dir: &Path) -> String {
    if dir.as_os_str().is_empty() || dir == Path::new(".") {
        format!("{kind}:{identity}")
    } else {
        format!("{kind}:{identity}@{}", crate::store::to_posix(dir))
    }
}

/// Outcome of fetching a set of sources.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, SourceError)>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `key: reason` lines for every failed source.
    pub fn failure_summary(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(key, error)| format!("{key}: {error}"))
            .collect()
    }
}

/// The declared sources of a project, in declaration order.
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: Vec<Box<dyn FileSource>>,
}

impl SourceSet {
    pub fn new(sources: Vec<Box<dyn FileSource>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Box<dyn FileSource>) {
        self.sources.push(source);
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn FileSource + 'static)> + '_ {
        self.sources.iter().map(|source| source.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.iter().map(|source| source.key()).collect()
    }

    /// Fetch every source into `root`, skipping those `skip` accepts.
    ///
    /// A failure is recorded and the remaining sources are still fetched.
    pub fn fetch_into(&self, root: &Path, skip: impl Fn(&str) -> bool) -> FetchReport {
        let mut report = FetchReport::default();
        for source in self.iter() {
            let key = source.key();
            if skip(&key) {
                report.skipped.push(key);
                continue;
            }

            let destination: PathBuf = root.join(source.relative_dir());
            let result = crate::store::ensure_dir(&destination)
                .map_err(SourceError::from)
                .and_then(|()| source.fetch(&destination));
            match result {
                Ok(()) => {
                    info!(source = %key, "fetched");
                    report.fetched.push(key);
                }
                Err(error) => {
                    warn!(source = %key, %error, "fetch failed");
                    report.failed.push((key, error));
                }
            }
        }
        report
    }
}

impl FromIterator<Box<dyn FileSource>> for SourceSet {
    fn from_iter<I: IntoIterator<Item = Box<dyn FileSource>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
