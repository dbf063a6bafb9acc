use super::errors::WorkspaceError;
use crate::store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Keys of the sources fetched successfully into the current clean tree.
///
/// Lives next to the clean tree, never inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLedger {
    pub fetched: BTreeSet<String>,
}

impl FetchLedger {
    /// `<parent>/.<clean-dir-name>.fetch.json`
    pub fn path_for(clean: &Path) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(clean.file_name().unwrap_or_else(|| clean.as_os_str()));
        name.push(".fetch.json");
        match clean.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    /// `Ok(None)` when no ledger has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>, WorkspaceError> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = store::read_bytes(path)?;
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| WorkspaceError::Ledger {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), WorkspaceError> {
        let content = serde_json::to_vec_pretty(self).map_err(|source| WorkspaceError::Ledger {
            path: path.to_path_buf(),
            source,
        })?;
        store::write_atomic(path, &content)?;
        Ok(())
    }

    pub fn remove(path: &Path) -> Result<(), WorkspaceError> {
        if path.is_file() {
            std::fs::remove_file(path).map_err(|source| store::StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fetched.contains(key)
    }
}
