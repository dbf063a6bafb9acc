use super::errors::{DecodeError, SourceError};
use super::{keyed, FileSource, SourceKind};
use crate::store::StoreError;
use git2::build::CheckoutBuilder;
use git2::{BranchType, Repository};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Checkout location inside a cloned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Branch(String),
    Tag(String),
    Commit(String),
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Branch(name) => write!(f, "branch {name}"),
            GitRef::Tag(name) => write!(f, "tag {name}"),
            GitRef::Commit(id) => write!(f, "commit {id}"),
        }
    }
}

/// A git repository cloned into the clean tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub repository: String,
    /// `None` keeps the remote's default branch.
    pub checkout: Option<GitRef>,
    pub dir: PathBuf,
}

// Wire form: at most one of `branch`, `tag` or `commit`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GitSourceFields {
    repository: String,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    commit: Option<String>,
    #[serde(default)]
    dir: PathBuf,
}

impl GitSource {
    pub fn new(repository: impl Into<String>, checkout: Option<GitRef>) -> Self {
        Self {
            repository: repository.into(),
            checkout,
            dir: PathBuf::new(),
        }
    }

    /// Registry decoder; rejects conflicting checkout keys before any I/O.
    pub fn decode(fields: Value) -> Result<Box<dyn FileSource>, DecodeError> {
        let fields: GitSourceFields =
            serde_json::from_value(fields).map_err(|source| DecodeError::Invalid {
                kind: Self::KIND.to_string(),
                source,
            })?;

        let candidates = [
            fields.branch.map(GitRef::Branch),
            fields.tag.map(GitRef::Tag),
            fields.commit.map(GitRef::Commit),
        ];
        let mut refs: Vec<GitRef> = candidates.into_iter().flatten().collect();
        if refs.len() > 1 {
            return Err(DecodeError::AmbiguousCheckout {
                found: refs
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(Box::new(GitSource {
            repository: fields.repository,
            checkout: refs.pop(),
            dir: fields.dir,
        }))
    }

    fn git_error(&self) -> impl Fn(git2::Error) -> SourceError + '_ {
        move |source| SourceError::Git {
            repository: self.repository.clone(),
            source,
        }
    }
}

impl SourceKind for GitSource {
    const KIND: &'static str = "git";
}

impl FileSource for GitSource {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn key(&self) -> String {
        let identity = match &self.checkout {
            Some(GitRef::Branch(name) | GitRef::Tag(name) | GitRef::Commit(name)) => {
                format!("{}#{name}", self.repository)
            }
            None => self.repository.clone(),
        };
        keyed(Self::KIND, &identity, &self.dir)
    }

    fn relative_dir(&self) -> &Path {
        &self.dir
    }

    fn fetch(&self, destination: &Path) -> Result<(), SourceError> {
        let mut entries = fs::read_dir(destination).map_err(|source| StoreError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        if entries.next().is_some() {
            return Err(SourceError::DestinationNotEmpty(destination.to_path_buf()));
        }

        let repo = Repository::clone(&self.repository, destination).map_err(self.git_error())?;
        if let Some(git_ref) = &self.checkout {
            checkout(&repo, git_ref).map_err(self.git_error())?;
        }
        debug!(repository = %self.repository, checkout = ?self.checkout, "cloned");
        Ok(())
    }
}

fn checkout(repo: &Repository, git_ref: &GitRef) -> Result<(), git2::Error> {
    let mut options = CheckoutBuilder::new();
    options.force();

    match git_ref {
        GitRef::Branch(name) => {
            let local = format!("refs/heads/{name}");
            if repo.find_reference(&local).is_err() {
                let upstream = format!("origin/{name}");
                let commit = repo
                    .find_branch(&upstream, BranchType::Remote)?
                    .get()
                    .peel_to_commit()?;
                let mut branch = repo.branch(name, &commit, false)?;
                branch.set_upstream(Some(upstream.as_str()))?;
            }
            let target = repo.revparse_single(&local)?;
            repo.checkout_tree(&target, Some(&mut options))?;
            repo.set_head(&local)
        }
        GitRef::Tag(name) | GitRef::Commit(name) => {
            let commit = repo.revparse_single(name)?.peel_to_commit()?;
            repo.checkout_tree(commit.as_object(), Some(&mut options))?;
            repo.set_head_detached(commit.id())
        }
    }
}
