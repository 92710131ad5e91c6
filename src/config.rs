use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::RunError;
use crate::git::SnapshotRepo;

/// Location of the identifier configuration inside the history repository.
pub const CONFIG_PATH: &str = "config.yaml";

const SKELETON: &str = "Playlists: []\nProfiles: []\n";

/// Identifier configuration, tracked in the history repository as `config.yaml`.
///
/// The file is edited by hand between runs and re-read at the start of
/// every run. Both lists are optional; `null` counts as empty.
///
/// Example YAML:
/// ```yaml
/// Playlists:
/// - 37i9dQZF1DXcBWIGoYBM5M
/// Profiles:
/// - spotify
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "Playlists", default, deserialize_with = "null_as_empty")]
    pub playlists: Vec<String>,
    #[serde(rename = "Profiles", default, deserialize_with = "null_as_empty")]
    pub profiles: Vec<String>,
}

fn null_as_empty<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(d).map(Option::unwrap_or_default)
}

impl Config {
    /// Parse the YAML document. An empty file is an empty configuration.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// The document written when a repository is first initialized.
    pub fn skeleton() -> &'static str {
        SKELETON
    }
}

/// Read and parse `config.yaml` from the repository.
///
/// # Errors
/// - [`RunError::ConfigRead`] if the file can't be read (e.g. deleted).
/// - [`RunError::ConfigEncoding`] if it isn't UTF-8.
/// - [`RunError::ConfigParse`] if it isn't valid YAML of the expected shape.
pub fn load_config(repo: &SnapshotRepo) -> Result<Config, RunError> {
    let raw = repo
        .read_file(Path::new(CONFIG_PATH))
        .map_err(RunError::ConfigRead)?;
    let text = std::str::from_utf8(&raw).map_err(RunError::ConfigEncoding)?;
    Config::parse(text).map_err(RunError::ConfigParse)
}

/// CLI command: print the configured identifiers.
///
/// Example output:
/// ```text
/// playlists
/// - 37i9dQZF1DXcBWIGoYBM5M
/// profiles
/// - spotify
/// ```
///
/// The repository must already exist; listing never creates one.
pub fn cmd_list(repo_dir: &Path) -> anyhow::Result<()> {
    let repo = SnapshotRepo::open(repo_dir)?;
    let cfg = load_config(&repo)?;
    println!("playlists");
    for id in &cfg.playlists {
        println!("- {}", id);
    }
    println!("profiles");
    for id in &cfg.profiles {
        println!("- {}", id);
    }
    Ok(())
}
