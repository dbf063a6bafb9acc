//! Project Patcher: keep local edits to a third-party project as patches.
//!
//! A project is split into four trees. The clean tree holds the pristine
//! files fetched from the declared sources. The working tree is where edits
//! happen. The patch tree holds one unified diff per edited file, and the
//! new-file tree holds files that have no clean counterpart.
//!
//! # Architecture
//!
//! - [`patch`] builds and applies line-oriented patch documents.
//! - [`workspace`] reconciles the trees in both directions.
//! - [`source`] fetches the clean tree; kinds are dispatched through an
//!   explicit [`SourceRegistry`].
//! - [`metadata`] and [`config`] decode the project metadata and the tool
//!   configuration.
//!
//! # Example
//!
//! ```no_run
//! use project_patcher::{metadata, SourceRegistry};
//! use std::path::Path;
//!
//! let registry = SourceRegistry::builtin();
//! let project = metadata::load_from_path("project_metadata.json", &registry)?;
//! let workspace = project.workspace(Path::new("."));
//!
//! workspace.reconcile_forward(&project.sources, false)?;
//! // ... edit files under src/ ...
//! let report = workspace.reconcile_reverse()?;
//! println!("{} patched, {} new", report.patched.len(), report.new.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod metadata;
pub mod patch;
pub mod source;
pub mod store;
pub mod workspace;

// Re-exports
pub use config::{ConfigError, PatcherConfig};
pub use metadata::{MetadataError, ProjectMetadata};
pub use patch::{apply_patch, create_patch, Direction, Patch, PatchError};
pub use source::{FileSource, SourceError, SourceRegistry, SourceSet};
pub use store::StoreError;
pub use workspace::{
    reconcile_forward, reconcile_reverse, CleanStatus, Workspace, WorkspaceError,
    WorkspaceLayout,
};
