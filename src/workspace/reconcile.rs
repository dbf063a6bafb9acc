use super::errors::WorkspaceError;
use super::filter::PathFilter;
use super::layout::{strip_patch_extension, WorkspaceLayout};
use super::ledger::FetchLedger;
use crate::patch::{apply_patch, create_patch, Direction, Patch};
use crate::source::SourceSet;
use crate::store;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};

/// State of the clean tree after [`Workspace::ensure_clean`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "CleanStatus reports whether every source was fetched"]
pub enum CleanStatus {
    /// Every declared source was already present; nothing was fetched.
    Cached,
    /// Missing sources were fetched and all succeeded.
    Fetched,
    /// Some sources failed; the tree holds whatever did arrive.
    Partial { failed: Vec<String> },
}

impl CleanStatus {
    pub fn is_complete(&self) -> bool {
        !matches!(self, CleanStatus::Partial { .. })
    }
}

impl fmt::Display for CleanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanStatus::Cached => write!(f, "clean tree already populated"),
            CleanStatus::Fetched => write!(f, "clean tree populated"),
            CleanStatus::Partial { failed } => {
                write!(f, "{} source(s) failed: {}", failed.len(), failed.join("; "))
            }
        }
    }
}

/// What a forward run put into the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardReport {
    /// Files seeded from the clean tree.
    pub seeded: Vec<PathBuf>,
    /// Files overlaid from the new-file tree.
    pub restored: Vec<PathBuf>,
    /// Working-tree files rewritten by a patch.
    pub patched: Vec<PathBuf>,
}

/// How a reverse run classified each working-tree file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseReport {
    pub patched: Vec<PathBuf>,
    pub new: Vec<PathBuf>,
    /// Copied to the new-file tree despite a clean counterpart.
    pub overwritten: Vec<PathBuf>,
    pub ignored: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Reconciler over one set of clean, working, patch and new-file trees.
#[derive(Debug, Clone)]
pub struct Workspace {
    layout: WorkspaceLayout,
    filter: PathFilter,
}

enum Derived {
    Patch(Patch),
    Copy,
    Unchanged,
}

impl Workspace {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self {
            layout,
            filter: PathFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Carry hidden files between the trees instead of skipping them.
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.filter = self.filter.with_hidden(include_hidden);
        self
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Keys of the declared sources the clean tree still lacks.
    ///
    /// A clean tree without a fetch ledger counts as complete.
    pub fn pending_sources(&self, sources: &SourceSet) -> Result<Vec<String>, WorkspaceError> {
        let clean = &self.layout.clean;
        if !clean.is_dir() {
            return Ok(sources.keys());
        }
        match FetchLedger::load(&FetchLedger::path_for(clean))? {
            Some(ledger) => Ok(sources
                .keys()
                .into_iter()
                .filter(|key| !ledger.contains(key))
                .collect()),
            None => {
                debug!(path = %clean.display(), "clean tree has no fetch ledger, assuming complete");
                Ok(Vec::new())
            }
        }
    }

    /// Populate the clean tree, fetching only the pending sources.
    ///
    /// Failed sources leave the rest of the tree in place and stay pending
    /// for the next call.
    pub fn ensure_clean(
        &self,
        sources: &SourceSet,
        invalidate_cache: bool,
    ) -> Result<CleanStatus, WorkspaceError> {
        let clean = &self.layout.clean;
        let ledger_path = FetchLedger::path_for(clean);

        if invalidate_cache {
            info!(path = %clean.display(), "invalidating clean tree");
            store::remove_tree(clean)?;
            FetchLedger::remove(&ledger_path)?;
        }

        let pending = self.pending_sources(sources)?;
        let mut ledger = if clean.is_dir() {
            if pending.is_empty() {
                debug!(path = %clean.display(), "all sources already fetched");
                return Ok(CleanStatus::Cached);
            }
            FetchLedger::load(&ledger_path)?.unwrap_or_default()
        } else {
            FetchLedger::remove(&ledger_path)?;
            FetchLedger::default()
        };

        // The ledger goes down before the tree so an interrupted fetch never
        // leaves a ledger-less clean tree behind.
        ledger.save(&ledger_path)?;
        store::ensure_dir(clean)?;
        let report = sources.fetch_into(clean, |key| !pending.iter().any(|p| p == key));
        ledger.fetched.extend(report.fetched.iter().cloned());
        ledger.save(&ledger_path)?;

        if report.is_success() {
            info!(fetched = report.fetched.len(), "clean tree populated");
            Ok(CleanStatus::Fetched)
        } else {
            Ok(CleanStatus::Partial {
                failed: report.failure_summary(),
            })
        }
    }

    /// Rebuild the working tree from the clean tree, new files and patches.
    ///
    /// Stops at the first patch that fails to apply. Each patched file is
    /// written only after its patch applied completely.
    pub fn build_working(&self) -> Result<ForwardReport, WorkspaceError> {
        let layout = &self.layout;
        if !layout.clean.is_dir() {
            return Err(WorkspaceError::MissingClean(layout.clean.clone()));
        }

        let walks = |relative: &Path| self.filter.walks(relative);
        store::remove_tree(&layout.working)?;
        let mut report = ForwardReport {
            seeded: store::copy_tree_filtered(&layout.clean, &layout.working, walks)?,
            ..ForwardReport::default()
        };
        if layout.out.is_dir() {
            report.restored = store::copy_tree_filtered(&layout.out, &layout.working, walks)?;
        }

        for patch_relative in store::list_files_filtered(&layout.patches, walks)? {
            let patch_path = layout.patches.join(&patch_relative);
            let Some(relative) = strip_patch_extension(&patch_relative) else {
                warn!(path = %patch_path.display(), "ignoring file without .patch suffix");
                continue;
            };
            let target = layout.working.join(&relative);
            if !target.is_file() {
                return Err(WorkspaceError::MissingPatchTarget {
                    patch: patch_path,
                    target,
                });
            }

            let apply_error = |source| WorkspaceError::Patch {
                path: patch_path.clone(),
                source,
            };
            let patch = Patch::parse(&store::read_text(&patch_path)?).map_err(apply_error)?;
            let content = store::read_text(&target)?;
            let patched = apply_patch(&content, &patch, Direction::Forward).map_err(apply_error)?;
            store::write_atomic(&target, patched.as_bytes())?;

            debug!(file = %relative.display(), hunks = patch.hunks.len(), "applied patch");
            report.patched.push(relative);
        }

        info!(
            seeded = report.seeded.len(),
            restored = report.restored.len(),
            patched = report.patched.len(),
            "working tree rebuilt"
        );
        Ok(report)
    }

    /// Ensure the clean tree, then rebuild the working tree from it.
    pub fn reconcile_forward(
        &self,
        sources: &SourceSet,
        invalidate_cache: bool,
    ) -> Result<ForwardReport, WorkspaceError> {
        if let CleanStatus::Partial { failed } = self.ensure_clean(sources, invalidate_cache)? {
            return Err(WorkspaceError::SourcesFailed { failed });
        }
        self.build_working()
    }

    /// Regenerate the patch and new-file trees from the working tree.
    pub fn reconcile_reverse(&self) -> Result<ReverseReport, WorkspaceError> {
        let layout = &self.layout;
        if !layout.working.is_dir() {
            return Err(WorkspaceError::MissingWorking(layout.working.clone()));
        }

        store::remove_tree(&layout.patches)?;
        store::remove_tree(&layout.out)?;

        let mut report = ReverseReport::default();
        let walks = |relative: &Path| self.filter.walks(relative);
        for relative in store::list_files_filtered(&layout.working, walks)? {
            let posix = store::to_posix(&relative);
            if self.filter.is_ignored(&posix) {
                report.ignored.push(relative);
                continue;
            }

            let working = layout.working.join(&relative);
            let clean = layout.clean.join(&relative);
            if !clean.is_file() {
                store::copy_file(&working, &layout.out.join(&relative))?;
                debug!(file = %posix, "new file");
                report.new.push(relative);
                continue;
            }

            match self.derive(&clean, &working, &posix)? {
                Derived::Unchanged => report.unchanged.push(relative),
                Derived::Copy => {
                    store::copy_file(&working, &layout.out.join(&relative))?;
                    debug!(file = %posix, "overwritten file");
                    report.overwritten.push(relative);
                }
                Derived::Patch(patch) => {
                    store::write_atomic(&layout.patch_path(&relative), patch.to_string().as_bytes())?;
                    debug!(file = %posix, hunks = patch.hunks.len(), "wrote patch");
                    report.patched.push(relative);
                }
            }
        }

        info!(
            patched = report.patched.len(),
            new = report.new.len(),
            overwritten = report.overwritten.len(),
            unchanged = report.unchanged.len(),
            "patches derived"
        );
        Ok(report)
    }

    /// The patch a reverse run would write for one working-tree file.
    ///
    /// `None` when the file would be skipped, copied verbatim or left unchanged.
    /// `relative` must stay below the working root: absolute paths and `..`
    /// are rejected.
    pub fn preview_patch(&self, relative: &Path) -> Result<Option<Patch>, WorkspaceError> {
        let contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(WorkspaceError::OutsideWorking(relative.to_path_buf()));
        }
        let posix = store::to_posix(relative);
        let working = self.layout.working.join(relative);
        let clean = self.layout.clean.join(relative);
        if !working.is_file() {
            return Err(store::StoreError::Io {
                path: working,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .into());
        }
        if !self.filter.walks(relative) || self.filter.is_ignored(&posix) || !clean.is_file() {
            return Ok(None);
        }
        match self.derive(&clean, &working, &posix)? {
            Derived::Patch(patch) => Ok(Some(patch)),
            Derived::Copy | Derived::Unchanged => Ok(None),
        }
    }

    fn derive(&self, clean: &Path, working: &Path, name: &str) -> Result<Derived, WorkspaceError> {
        if self.filter.is_overwritten(name) {
            return Ok(Derived::Copy);
        }

        let old = store::read_bytes(clean)?;
        let new = store::read_bytes(working)?;
        if old == new {
            return Ok(Derived::Unchanged);
        }

        match (String::from_utf8(old), String::from_utf8(new)) {
            (Ok(old), Ok(new)) => {
                let patch = create_patch(&old, &new, name);
                if patch.is_empty() {
                    Ok(Derived::Unchanged)
                } else {
                    Ok(Derived::Patch(patch))
                }
            }
            _ => {
                debug!(file = %name, "binary change, copying verbatim");
                Ok(Derived::Copy)
            }
        }
    }
}

/// Forward reconciliation over explicit roots, reported as plain success.
pub fn reconcile_forward(
    clean: &Path,
    working: &Path,
    patches: &Path,
    out: &Path,
    sources: &SourceSet,
    invalidate_cache: bool,
) -> bool {
    let workspace = Workspace::new(WorkspaceLayout::new(clean, working, patches, out));
    match workspace.reconcile_forward(sources, invalidate_cache) {
        Ok(_) => true,
        Err(err) => {
            error!(error = %err, "forward reconciliation failed");
            false
        }
    }
}

/// Reverse reconciliation over explicit roots, reported as plain success.
pub fn reconcile_reverse(clean: &Path, working: &Path, patches: &Path, out: &Path) -> bool {
    let workspace = Workspace::new(WorkspaceLayout::new(clean, working, patches, out));
    match workspace.reconcile_reverse() {
        Ok(_) => true,
        Err(err) => {
            error!(error = %err, "reverse reconciliation failed");
            false
        }
    }
}
