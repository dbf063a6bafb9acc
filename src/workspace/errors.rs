use crate::patch::PatchError;
use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to apply {path}: {source}")]
    Patch {
        path: PathBuf,
        #[source]
        source: PatchError,
    },

    #[error("clean tree {0} does not exist")]
    MissingClean(PathBuf),

    #[error("working tree {0} does not exist")]
    MissingWorking(PathBuf),

    #[error("{0} is not a path inside the working tree")]
    OutsideWorking(PathBuf),

    #[error("{patch} targets {target}, which is not in the working tree")]
    MissingPatchTarget { patch: PathBuf, target: PathBuf },

    #[error("{} source(s) failed to fetch: {}", .failed.len(), .failed.join("; "))]
    SourcesFailed { failed: Vec<String> },

    #[error("fetch ledger {path} is corrupt: {source}")]
    Ledger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
