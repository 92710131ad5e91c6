//! Error types shared across the pipeline.
//!
//! Errors fall into two groups:
//! - **fatal** ([`SetupError`], [`RunError`]): stop the run (and, from the
//!   scheduler, the process).
//! - **per entity** ([`EntityError`]): reported on the run's error channel and
//!   skipped; the run still commits whatever succeeded.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::run::jobs::EntityKind;

/// Process bootstrap failures. Always terminate the process.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("missing Spotify credentials: {0} not set")]
    MissingCredentials(&'static str),

    #[error("GITDIR not set")]
    MissingRepoDir,

    #[error("couldn't resolve path for GITDIR {0:?}: HOME not set")]
    UnresolvablePath(String),

    #[error("couldn't parse PERIOD {raw:?}: expected whole minutes")]
    InvalidPeriod { raw: String },

    #[error("couldn't read settings file {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't parse settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Failures of the versioned store.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("repository unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("couldn't write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't stage {path}: {source}")]
    Stage { path: PathBuf, source: git2::Error },

    #[error("couldn't commit: {0}")]
    Commit(#[source] git2::Error),
}

/// Errors returned by the remote music service capability.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited by remote service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("remote service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("couldn't decode response: {0}")]
    Decode(String),

    #[error("couldn't obtain access token: {0}")]
    Token(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting and server-side (5xx) errors are
    /// transient. Client errors such as 404 are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::RateLimited { .. } => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) | ApiError::Token(_) | ApiError::InvalidUrl(_) => false,
        }
    }

    /// Minimum delay requested by the remote side before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Failure to process a single configured identifier. Never aborts a run.
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("couldn't get {kind} {id:?}: {source}")]
    Fetch {
        kind: EntityKind,
        id: String,
        source: ApiError,
    },

    #[error("couldn't get {kind} {id:?}: page {page}: {source}")]
    FetchPage {
        kind: EntityKind,
        id: String,
        page: usize,
        source: ApiError,
    },

    #[error("couldn't marshal {kind} {id:?}: {source}")]
    Projection {
        kind: EntityKind,
        id: String,
        source: serde_yaml::Error,
    },

    #[error("couldn't store {kind} {id:?}: {source}")]
    Store {
        kind: EntityKind,
        id: String,
        source: RepoError,
    },
}

impl EntityError {
    pub fn id(&self) -> &str {
        match self {
            EntityError::Fetch { id, .. }
            | EntityError::FetchPage { id, .. }
            | EntityError::Projection { id, .. }
            | EntityError::Store { id, .. } => id,
        }
    }
}

/// Fatal run failures: the run stops before (or instead of) committing.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("error reading config: {0}")]
    ConfigRead(#[source] RepoError),

    #[error("error parsing config: not valid UTF-8: {0}")]
    ConfigEncoding(#[source] std::str::Utf8Error),

    #[error("error parsing config: {0}")]
    ConfigParse(#[source] serde_yaml::Error),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("couldn't connect to remote service: {0}")]
    Connect(#[source] ApiError),
}
