use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::{CONFIG_PATH, Config};
use crate::error::RepoError;
use crate::git::SnapshotRepo;

/// Commit message of the bootstrap commit.
pub const INIT_MESSAGE: &str = "init with empty config";

/// Open the history repository, initializing it on first use.
///
/// A freshly initialized repository gets an empty `config.yaml` committed
/// on its own, so history starts from a clean baseline before any snapshot
/// is taken. An existing repository is returned untouched.
///
/// # Errors
/// Returns an error if the repository can't be opened or created, or if the
/// bootstrap commit fails.
pub fn open_repository(dir: &Path) -> Result<SnapshotRepo, RepoError> {
    let (repo, initialized) = SnapshotRepo::open_or_init(dir)?;
    if initialized {
        repo.write_and_stage(Path::new(CONFIG_PATH), Config::skeleton().as_bytes())?;
        repo.commit(INIT_MESSAGE)?;
        info!(path = %repo.root().display(), "wrote empty config");
    }
    Ok(repo)
}

/// CLI command: make sure the history repository exists and print its path.
///
/// Useful before the first `run`, to get a `config.yaml` to fill in.
///
/// # Errors
/// Returns an error if the repository can't be opened or initialized.
pub fn cmd_init(repo_dir: &Path) -> Result<()> {
    let repo = open_repository(repo_dir)?;
    println!("{}", repo.root().join(CONFIG_PATH).display());
    Ok(())
}
