//! # spotify-togit (togit)
//!
//! **togit** keeps a git history of Spotify playlists and user profiles.
//!
//! Features:
//! - Identifiers to track live in `config.yaml` at the root of the history repo
//! - `togit init` creates the history repo with an empty `config.yaml`
//! - `togit run` snapshots every configured identifier and commits, once or every `PERIOD` minutes
//! - `togit list` prints the configured identifiers
//!
//! Logging goes to stderr and is filtered with `RUST_LOG`.
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use spotify_togit::{Settings, SettingsArgs, cmd_init, cmd_list, cmd_run};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "togit",
    version,
    about = "spotify-togit - keep a git history of Spotify playlists and profiles",
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Settings shared by all subcommands. Each can also come from the environment.
#[derive(Args, Debug)]
struct GlobalArgs {
    /// Optional TOML settings file
    #[arg(long, global = true, env = "TOGIT_SETTINGS")]
    settings: Option<PathBuf>,

    /// Spotify application client id
    #[arg(long, global = true, env = "SPOTIFY_ID", hide_env_values = true)]
    client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, global = true, env = "SPOTIFY_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Directory of the history repository (`~` is expanded)
    #[arg(long, global = true, env = "GITDIR")]
    git_dir: Option<String>,

    /// Minutes between runs; 0 or unset runs once
    #[arg(long, global = true, env = "PERIOD")]
    period: Option<String>,
}

impl From<GlobalArgs> for SettingsArgs {
    fn from(a: GlobalArgs) -> Self {
        SettingsArgs {
            settings_file: a.settings,
            client_id: a.client_id,
            client_secret: a.client_secret,
            git_dir: a.git_dir,
            period: a.period,
        }
    }
}

/// Available subcommands.
///
/// Each variant corresponds to a subcommand of `togit`.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create the history repository with an empty config.yaml
    Init,
    /// Snapshot configured playlists and profiles and commit
    Run,
    /// List configured identifiers
    List,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotify_togit=info,togit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// CLI entry point.
///
/// Parses arguments with `clap`, resolves settings and executes the selected
/// subcommand.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.global.into())?;

    match cli.cmd {
        Cmd::Init => cmd_init(&settings.repo_dir),
        Cmd::Run => cmd_run(&settings),
        Cmd::List => cmd_list(&settings.repo_dir),
    }
}
