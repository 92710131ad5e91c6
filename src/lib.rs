//! Crate entry point for **spotify-togit**.
//!
//! Snapshots Spotify playlists and user profiles into YAML files inside a
//! local git repository and commits once per run, so the repository history
//! records how each playlist and profile changed over time.
//!
//! Each submodule encapsulates one responsibility (remote API, fetching with
//! retries, projection into the on-disk schema, the git store, the run
//! pipeline). The `pub use` re-exports make the commands and the pieces the
//! pipeline is assembled from accessible directly from the crate root.

mod config;
mod error;
mod fetch;
mod git;
mod init;
mod run;
mod schedule;
mod settings;
pub mod snapshot;
pub mod spotify;

/// Re-export commonly used types and commands so they can be accessed from `spotify_togit::*`.
pub use config::{CONFIG_PATH, Config, cmd_list};
pub use error::{ApiError, EntityError, RepoError, RunError, SetupError};
pub use fetch::{FetchedPlaylist, FetchedProfile, Fetcher, RetryPolicy};
pub use git::{SnapshotRepo, WriteOutcome};
pub use init::{INIT_MESSAGE, cmd_init, open_repository};
pub use run::jobs::EntityKind;
pub use run::{Pipeline, RUN_MESSAGE, RunSummary, cmd_run};
pub use schedule::run_on_schedule;
pub use settings::{Settings, SettingsArgs};
