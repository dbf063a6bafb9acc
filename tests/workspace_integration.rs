//! End-to-end reconciliation over real directory trees.

use project_patcher::source::{FileSource, SourceError, SourceSet};
use project_patcher::store;
use project_patcher::workspace::{
    CleanStatus, FetchLedger, Locations, PathFilter, Workspace, WorkspaceError, WorkspaceLayout,
};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Writes a fixed file and counts how often it was asked to.
#[derive(Debug)]
struct FakeSource {
    name: &'static str,
    calls: Rc<Cell<usize>>,
    failures_left: Rc<Cell<usize>>,
}

impl FakeSource {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Rc::new(Cell::new(0)),
            failures_left: Rc::new(Cell::new(0)),
        }
    }

    fn failing_once(name: &'static str) -> Self {
        let source = Self::new(name);
        source.failures_left.set(1);
        source
    }
}

impl FileSource for FakeSource {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn key(&self) -> String {
        format!("fake:{}", self.name)
    }

    fn relative_dir(&self) -> &Path {
        Path::new("")
    }

    fn fetch(&self, destination: &Path) -> Result<(), SourceError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(SourceError::Status {
                url: self.name.to_string(),
                status: 503,
            });
        }
        store::write_atomic(
            &destination.join(format!("{}.txt", self.name)),
            format!("{} v1\n", self.name).as_bytes(),
        )?;
        Ok(())
    }
}

fn workspace(temp_dir: &TempDir) -> Workspace {
    Workspace::new(WorkspaceLayout::from_root(
        temp_dir.path(),
        &Locations::default(),
    ))
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    store::list_files(root)
        .unwrap()
        .into_iter()
        .map(|relative| {
            let content = fs::read(root.join(&relative)).unwrap();
            (relative, content)
        })
        .collect()
}

#[test]
fn reverse_then_forward_reproduces_working_tree() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();

    write(&layout.clean, "app.py", "import os\n\ndef main():\n    print('hi')\n");
    write(&layout.clean, "lib/util.py", "def f():\n    return 1\n");
    write(&layout.clean, "README", "pristine readme");
    workspace.build_working().unwrap();

    write(&layout.working, "app.py", "import os\nimport sys\n\ndef main():\n    print('hello')\n");
    write(&layout.working, "README", "pristine readme\n");
    write(&layout.working, "lib/extra.py", "X = 2\n");
    let edited = snapshot(&layout.working);

    let report = workspace.reconcile_reverse().unwrap();
    assert_eq!(
        report.patched,
        vec![PathBuf::from("README"), PathBuf::from("app.py")]
    );
    assert_eq!(report.new, vec![PathBuf::from("lib/extra.py")]);
    assert_eq!(report.unchanged, vec![PathBuf::from("lib/util.py")]);
    assert!(layout.patches.join("app.py.patch").is_file());
    assert!(layout.out.join("lib/extra.py").is_file());

    store::remove_tree(&layout.working).unwrap();
    let forward = workspace.build_working().unwrap();
    assert_eq!(forward.patched.len(), 2);
    assert_eq!(snapshot(&layout.working), edited);
}

#[test]
fn unchanged_file_yields_no_patch() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "same.txt", "no edits\n");
    workspace.build_working().unwrap();

    let report = workspace.reconcile_reverse().unwrap();
    assert_eq!(report.unchanged, vec![PathBuf::from("same.txt")]);
    assert!(store::list_files(&layout.patches).unwrap().is_empty());
    assert!(store::list_files(&layout.out).unwrap().is_empty());
}

#[test]
fn new_file_is_copied_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    fs::create_dir_all(&layout.clean).unwrap();
    workspace.build_working().unwrap();
    write(&layout.working, "docs/notes.md", "# Notes\r\nno final newline");

    let report = workspace.reconcile_reverse().unwrap();
    assert_eq!(report.new, vec![PathBuf::from("docs/notes.md")]);
    assert_eq!(
        fs::read_to_string(layout.out.join("docs/notes.md")).unwrap(),
        "# Notes\r\nno final newline"
    );
    assert!(!layout.patches.join("docs/notes.md.patch").exists());
}

#[test]
fn reverse_discards_stale_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "a.txt", "a\n");
    workspace.build_working().unwrap();
    write(&layout.patches, "old.txt.patch", "@@ -1 +1 @@\n-a\n+b\n");
    write(&layout.out, "removed.txt", "gone\n");

    workspace.reconcile_reverse().unwrap();
    assert!(!layout.patches.join("old.txt.patch").exists());
    assert!(!layout.out.join("removed.txt").exists());
}

#[test]
fn bad_patch_aborts_without_partial_output() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "short.txt", "one\ntwo\n");
    write(&layout.patches, "short.txt.patch", "@@ -9,1 +9,1 @@\n-nine\n+NINE\n");

    let err = workspace.build_working().unwrap_err();
    assert!(matches!(err, WorkspaceError::Patch { .. }));
    assert_eq!(
        fs::read_to_string(layout.working.join("short.txt")).unwrap(),
        "one\ntwo\n"
    );
}

#[test]
fn context_mismatch_aborts() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "a.txt", "alpha\nbeta\n");
    write(&layout.patches, "a.txt.patch", "@@ -1,2 +1,2 @@\n alpha\n-gamma\n+delta\n");

    let err = workspace.build_working().unwrap_err();
    assert!(matches!(err, WorkspaceError::Patch { .. }));
}

#[test]
fn second_forward_run_uses_cached_clean_tree() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    let source = FakeSource::new("upstream");
    let calls = Rc::clone(&source.calls);
    let sources: SourceSet = vec![Box::new(source) as Box<dyn FileSource>]
        .into_iter()
        .collect();

    workspace.reconcile_forward(&sources, false).unwrap();
    assert_eq!(calls.get(), 1);
    write(&layout.clean, "sentinel", "untouched\n");

    let report = workspace.reconcile_forward(&sources, false).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(
        fs::read_to_string(layout.clean.join("sentinel")).unwrap(),
        "untouched\n"
    );
    assert!(report.seeded.contains(&PathBuf::from("upstream.txt")));

    assert_eq!(
        workspace.ensure_clean(&sources, true).unwrap(),
        CleanStatus::Fetched
    );
    assert_eq!(calls.get(), 2);
    assert!(!layout.clean.join("sentinel").exists());
}

#[test]
fn partial_fetch_retries_only_failed_sources() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    let stable = FakeSource::new("stable");
    let flaky = FakeSource::failing_once("flaky");
    let stable_calls = Rc::clone(&stable.calls);
    let flaky_calls = Rc::clone(&flaky.calls);
    let sources: SourceSet = vec![
        Box::new(stable) as Box<dyn FileSource>,
        Box::new(flaky) as Box<dyn FileSource>,
    ]
    .into_iter()
    .collect();

    let err = workspace.reconcile_forward(&sources, false).unwrap_err();
    assert!(matches!(err, WorkspaceError::SourcesFailed { ref failed } if failed.len() == 1));
    assert!(layout.clean.join("stable.txt").is_file());
    assert_eq!(
        workspace.pending_sources(&sources).unwrap(),
        vec!["fake:flaky".to_string()]
    );

    let ledger = FetchLedger::load(&FetchLedger::path_for(&layout.clean))
        .unwrap()
        .unwrap();
    assert!(ledger.contains("fake:stable"));
    assert!(!ledger.contains("fake:flaky"));

    assert_eq!(
        workspace.ensure_clean(&sources, false).unwrap(),
        CleanStatus::Fetched
    );
    assert_eq!(stable_calls.get(), 1);
    assert_eq!(flaky_calls.get(), 2);
    assert!(layout.clean.join("flaky.txt").is_file());
    assert!(workspace.pending_sources(&sources).unwrap().is_empty());
}

#[test]
fn clean_tree_without_ledger_counts_as_complete() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "hand-placed.txt", "x\n");
    let source = FakeSource::new("upstream");
    let calls = Rc::clone(&source.calls);
    let sources: SourceSet = vec![Box::new(source) as Box<dyn FileSource>]
        .into_iter()
        .collect();

    assert_eq!(
        workspace.ensure_clean(&sources, false).unwrap(),
        CleanStatus::Cached
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn filters_shape_reverse_output() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir)
        .with_filter(PathFilter::new(&["*.pyc"], &["data/*.csv"]).unwrap());
    let layout = workspace.layout().clone();
    write(&layout.clean, "data/table.csv", "a,b\n");
    workspace.build_working().unwrap();
    write(&layout.working, "data/table.csv", "a,b\n1,2\n");
    write(&layout.working, "pkg/__pycache__/mod.pyc", "bytecode");

    let report = workspace.reconcile_reverse().unwrap();
    assert_eq!(report.overwritten, vec![PathBuf::from("data/table.csv")]);
    assert_eq!(
        report.ignored,
        vec![PathBuf::from("pkg/__pycache__/mod.pyc")]
    );

    store::remove_tree(&layout.working).unwrap();
    workspace.build_working().unwrap();
    assert_eq!(
        fs::read_to_string(layout.working.join("data/table.csv")).unwrap(),
        "a,b\n1,2\n"
    );
    assert!(!layout.working.join("pkg").exists());
}

#[test]
fn blank_line_growth_survives_reverse_then_forward() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "notes.txt", "title\n\n");
    workspace.build_working().unwrap();
    write(&layout.working, "notes.txt", "\n\n\n\n\n\n");

    let report = workspace.reconcile_reverse().unwrap();
    assert_eq!(report.patched, vec![PathBuf::from("notes.txt")]);
    let written = fs::read_to_string(layout.patches.join("notes.txt.patch")).unwrap();
    assert!(written.contains("@@ -1,2 +1,6 @@"), "{written}");

    store::remove_tree(&layout.working).unwrap();
    workspace.build_working().unwrap();
    assert_eq!(
        fs::read_to_string(layout.working.join("notes.txt")).unwrap(),
        "\n\n\n\n\n\n"
    );
}

#[test]
#[cfg(unix)]
fn file_name_with_line_break_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, "odd\nname.txt", "a\nb\n");
    workspace.build_working().unwrap();
    write(&layout.working, "odd\nname.txt", "a\nB\n");

    workspace.reconcile_reverse().unwrap();
    store::remove_tree(&layout.working).unwrap();
    workspace.build_working().unwrap();
    assert_eq!(
        fs::read_to_string(layout.working.join("odd\nname.txt")).unwrap(),
        "a\nB\n"
    );
}

#[test]
fn git_metadata_in_clean_tree_never_becomes_output() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace(&temp_dir);
    let layout = workspace.layout().clone();
    write(&layout.clean, ".git/HEAD", "ref: refs/heads/main\n");
    write(&layout.clean, "README", "hello\n");
    workspace.build_working().unwrap();

    write(&layout.working, ".git/HEAD", "ref: refs/heads/feature\n");
    write(&layout.working, ".git/objects/ab/cdef", "blob");
    let report = workspace.reconcile_reverse().unwrap();
    assert!(report.patched.is_empty());
    assert!(report.new.is_empty());
    assert!(!layout.patches.join(".git/HEAD.patch").exists());
    assert!(!layout.out.join(".git").exists());
}
