pub mod jobs;
mod reporter;

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::{CONFIG_PATH, load_config};
use crate::error::{EntityError, RunError};
use crate::fetch::{Fetcher, RetryPolicy};
use crate::git::{SnapshotRepo, WriteOutcome};
use crate::init::open_repository;
use crate::schedule::run_on_schedule;
use crate::settings::Settings;
use crate::snapshot::{project_playlist, project_profile, to_yaml};
use crate::spotify::{MusicApi, SpotifyClient};

use jobs::{EntityKind, SnapshotJob, build_jobs};
use reporter::ErrorReporter;

/// Commit message of every run.
pub const RUN_MESSAGE: &str = "routine run";

/// What a finished run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub failures: Vec<EntityError>,
}

/// One fetch → project → write → commit pass over the configured identifiers.
pub struct Pipeline<'a, A: MusicApi + ?Sized> {
    repo: &'a SnapshotRepo,
    fetcher: Fetcher<'a, A>,
}

impl<'a, A: MusicApi + ?Sized> Pipeline<'a, A> {
    /// Bind a run to the history repository and the remote service.
    pub fn new(repo: &'a SnapshotRepo, api: &'a A, retry: RetryPolicy) -> Self {
        Self {
            repo,
            fetcher: Fetcher::new(api, retry),
        }
    }

    /// Execute a run.
    ///
    /// Stages, in order:
    /// 1. Load `config.yaml` (and stage it, so edits made between runs are
    ///    recorded by this run's commit).
    /// 2. Ensure `playlists/` and `profiles/` exist.
    /// 3. Snapshot every configured identifier, one at a time. Failures are
    ///    handed to the [`ErrorReporter`] and the next identifier proceeds.
    /// 4. Drain the reporter, then create exactly one commit, whether or not
    ///    anything changed.
    ///
    /// # Errors
    /// Only fatal failures are returned: unreadable or malformed config,
    /// directory creation, and staging the config or committing.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let cfg = load_config(self.repo)?;
        self.repo.stage(Path::new(CONFIG_PATH))?;

        for kind in EntityKind::ALL {
            self.repo.ensure_dir(Path::new(kind.dir()))?;
        }

        let jobs = build_jobs(&cfg);
        info!(
            playlists = cfg.playlists.len(),
            profiles = cfg.profiles.len(),
            "run started"
        );

        let reporter = ErrorReporter::spawn();
        let mut summary = RunSummary::default();
        for job in &jobs {
            match self.snapshot(job) {
                Ok(WriteOutcome::Updated) => {
                    info!(kind = %job.kind, id = %job.id, "updated");
                    summary.updated += 1;
                }
                Ok(WriteOutcome::Unchanged) => {
                    info!(kind = %job.kind, id = %job.id, "unchanged");
                    summary.unchanged += 1;
                }
                Err(e) => reporter.report(e),
            }
        }
        summary.failures = reporter.finish();

        let oid = self.repo.commit(RUN_MESSAGE)?;
        info!(
            %oid,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failures.len(),
            "run committed"
        );
        Ok(summary)
    }

    fn snapshot(&self, job: &SnapshotJob) -> Result<WriteOutcome, EntityError> {
        let text = match job.kind {
            EntityKind::Playlist => {
                let fetched = self.fetcher.playlist(&job.id)?;
                to_yaml(&project_playlist(&fetched))
            }
            EntityKind::Profile => {
                let fetched = self.fetcher.profile(&job.id)?;
                to_yaml(&project_profile(&fetched))
            }
        }
        .map_err(|source| EntityError::Projection {
            kind: job.kind,
            id: job.id.clone(),
            source,
        })?;

        self.repo
            .write_and_stage(&job.path, text.as_bytes())
            .map_err(|source| EntityError::Store {
                kind: job.kind,
                id: job.id.clone(),
                source,
            })
    }
}

/// CLI command: snapshot all configured identifiers, once or periodically.
///
/// High-level flow:
/// 1. Check credentials and open (or initialize) the history repository.
/// 2. Per tick: obtain a fresh access token, then run the [`Pipeline`].
/// 3. With a zero period, stop after the first run; otherwise sleep and repeat.
///
/// # Errors
/// Missing credentials, an unusable repository, a failed token request, or
/// any fatal run error. The first one ends the loop and is returned.
pub fn cmd_run(settings: &Settings) -> Result<()> {
    let creds = settings.credentials()?;
    let repo = open_repository(&settings.repo_dir)?;

    run_on_schedule(settings.period, || -> Result<()> {
        let client = settings
            .retry
            .run("token", || SpotifyClient::connect(&creds, &settings.endpoints))
            .map_err(RunError::Connect)?;
        Pipeline::new(&repo, &client, settings.retry).run()?;
        Ok(())
    })
}
