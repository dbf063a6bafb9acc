use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a mirrored relative path to name its patch file.
pub const PATCH_EXTENSION: &str = "patch";

/// Directory names of the four trees, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Locations {
    pub clean: PathBuf,
    pub src: PathBuf,
    pub patches: PathBuf,
    pub out: PathBuf,
}

impl Default for Locations {
    fn default() -> Self {
        Self {
            clean: PathBuf::from("clean"),
            src: PathBuf::from("src"),
            patches: PathBuf::from("patches"),
            out: PathBuf::from("out"),
        }
    }
}

/// Resolved roots of the clean, working, patch and new-file trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub clean: PathBuf,
    pub working: PathBuf,
    pub patches: PathBuf,
    pub out: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(
        clean: impl Into<PathBuf>,
        working: impl Into<PathBuf>,
        patches: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clean: clean.into(),
            working: working.into(),
            patches: patches.into(),
            out: out.into(),
        }
    }

    pub fn from_root(root: &Path, locations: &Locations) -> Self {
        Self::new(
            root.join(&locations.clean),
            root.join(&locations.src),
            root.join(&locations.patches),
            root.join(&locations.out),
        )
    }

    /// `<patches>/<relative>.patch`
    pub fn patch_path(&self, relative: &Path) -> PathBuf {
        let mut name = OsString::from(relative.as_os_str());
        name.push(".");
        name.push(PATCH_EXTENSION);
        self.patches.join(name)
    }
}

/// Working-tree relative path named by a patch file's relative path.
///
/// Returns `None` for files that do not carry the patch suffix.
pub fn strip_patch_extension(patch_relative: &Path) -> Option<PathBuf> {
    let name = patch_relative.file_name()?.to_str()?;
    let stem = name.strip_suffix(PATCH_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(patch_relative.with_file_name(stem))
}
