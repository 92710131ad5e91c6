use git2::{Commit, ErrorCode, Oid, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RepoError;

const COMMITTER_NAME: &str = "spotify-togit";
const COMMITTER_EMAIL: &str = "spotify-togit@localhost";

#[cfg(unix)]
const FILE_MODE: u32 = 0o660;
#[cfg(unix)]
const DIR_MODE: u32 = 0o770;

/// Result of [`SnapshotRepo::write_and_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Updated,
    Unchanged,
}

/// A git working tree that holds the configuration document and snapshot files.
///
/// All file I/O of the pipeline goes through this type: reading the config,
/// creating the entity directories, writing snapshots and staging them, and
/// finally committing the run.
pub struct SnapshotRepo {
    repo: Repository,
    root: PathBuf,
}

impl SnapshotRepo {
    /// Open the repository at `path`, or initialize a new one.
    ///
    /// - If `path` is an existing git working tree it is opened as-is.
    /// - If `path` does not exist, or exists but is not a repository, the
    ///   directory is created (if needed) and `git init` is run in it.
    ///
    /// Returns the handle and whether the repository was freshly initialized.
    ///
    /// # Errors
    /// [`RepoError::Unavailable`] if the path cannot be created or opened
    /// (permissions, a regular file in the way, a corrupt repository, …).
    pub fn open_or_init(path: &Path) -> Result<(Self, bool), RepoError> {
        let unavailable = |source: Box<dyn std::error::Error + Send + Sync>| {
            RepoError::Unavailable {
                path: path.to_path_buf(),
                source,
            }
        };

        match Repository::open(path) {
            Ok(repo) => {
                debug!(path = %path.display(), "opened repository");
                Ok((Self::from_repo(repo, path), false))
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                fs::create_dir_all(path).map_err(|e| unavailable(e.into()))?;
                let repo = Repository::init(path).map_err(|e| unavailable(e.into()))?;
                info!(path = %path.display(), "initialized repository");
                Ok((Self::from_repo(repo, path), true))
            }
            Err(e) => Err(unavailable(e.into())),
        }
    }

    /// Open an existing repository at `path` without creating anything.
    ///
    /// # Errors
    /// [`RepoError::Unavailable`] if `path` is missing or not a repository.
    pub fn open(path: &Path) -> Result<Self, RepoError> {
        let repo = Repository::open(path).map_err(|e| RepoError::Unavailable {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Self::from_repo(repo, path))
    }

    fn from_repo(repo: Repository, path: &Path) -> Self {
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());
        Self { repo, root }
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file relative to the working tree root.
    pub fn read_file(&self, rel: &Path) -> Result<Vec<u8>, RepoError> {
        let full = self.root.join(rel);
        fs::read(&full).map_err(|source| RepoError::Io { path: full, source })
    }

    /// Create a directory relative to the root. Existing directories are fine.
    pub fn ensure_dir(&self, rel: &Path) -> Result<(), RepoError> {
        let full = self.root.join(rel);
        let io = |source| RepoError::Io {
            path: full.clone(),
            source,
        };
        if !full.is_dir() {
            fs::create_dir_all(&full).map_err(io)?;
            set_mode(&full, DirOrFile::Dir).map_err(io)?;
        }
        Ok(())
    }

    /// Write `bytes` to `rel` and stage it for the next commit.
    ///
    /// The stored content always ends with exactly one trailing newline.
    /// If the file already holds identical content it is left untouched
    /// (but still staged) and [`WriteOutcome::Unchanged`] is returned.
    ///
    /// # Errors
    /// - [`RepoError::Io`] if the file (or its parent directory) can't be written.
    /// - [`RepoError::Stage`] if the index can't be updated.
    pub fn write_and_stage(&self, rel: &Path, bytes: &[u8]) -> Result<WriteOutcome, RepoError> {
        let full = self.root.join(rel);
        let io = |source| RepoError::Io {
            path: full.clone(),
            source,
        };

        let mut content = bytes.to_vec();
        if !content.ends_with(b"\n") {
            content.push(b'\n');
        }

        let outcome = match fs::read(&full) {
            Ok(old) if old == content => WriteOutcome::Unchanged,
            _ => WriteOutcome::Updated,
        };

        if outcome == WriteOutcome::Updated {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).map_err(io)?;
            }
            fs::write(&full, &content).map_err(io)?;
            set_mode(&full, DirOrFile::File).map_err(io)?;
        }

        self.stage(rel)?;
        Ok(outcome)
    }

    /// Add `rel` (relative to the root) to the index.
    pub fn stage(&self, rel: &Path) -> Result<(), RepoError> {
        let stage = |source| RepoError::Stage {
            path: rel.to_path_buf(),
            source,
        };
        let mut index = self.repo.index().map_err(stage)?;
        index.add_path(rel).map_err(stage)?;
        index.write().map_err(stage)?;
        Ok(())
    }

    /// Commit the current index on top of HEAD.
    ///
    /// A commit is created even when the tree equals the parent's tree, so an
    /// unchanged run still leaves a marker in history. On an unborn branch the
    /// commit becomes the root commit.
    ///
    /// # Errors
    /// [`RepoError::Commit`] if the tree can't be written or the commit can't
    /// be created.
    pub fn commit(&self, message: &str) -> Result<Oid, RepoError> {
        let sig = Signature::now(COMMITTER_NAME, COMMITTER_EMAIL).map_err(RepoError::Commit)?;
        let mut index = self.repo.index().map_err(RepoError::Commit)?;
        let tree_id = index.write_tree().map_err(RepoError::Commit)?;
        let tree = self.repo.find_tree(tree_id).map_err(RepoError::Commit)?;

        let parent = self.head_commit()?;
        let parents: Vec<&Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(RepoError::Commit)?;
        debug!(%oid, msg = message, "committed");
        Ok(oid)
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>, RepoError> {
        match self.repo.head() {
            Ok(head) => head.peel_to_commit().map(Some).map_err(RepoError::Commit),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(RepoError::Commit(e)),
        }
    }
}

enum DirOrFile {
    Dir,
    File,
}

#[cfg(unix)]
fn set_mode(p: &Path, kind: DirOrFile) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = match kind {
        DirOrFile::Dir => DIR_MODE,
        DirOrFile::File => FILE_MODE,
    };
    let mut perm = fs::metadata(p)?.permissions();
    perm.set_mode(mode);
    fs::set_permissions(p, perm)
}

#[cfg(not(unix))]
fn set_mode(_p: &Path, _kind: DirOrFile) -> std::io::Result<()> {
    Ok(())
}
