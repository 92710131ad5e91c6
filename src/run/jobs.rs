use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

use crate::config::Config;

/// The two kinds of tracked entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Playlist,
    Profile,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Playlist, EntityKind::Profile];

    /// Directory (relative to the repository root) holding this kind's snapshots.
    pub fn dir(self) -> &'static str {
        match self {
            EntityKind::Playlist => "playlists",
            EntityKind::Profile => "profiles",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Playlist => "playlist",
            EntityKind::Profile => "profile",
        })
    }
}

/// One identifier to snapshot during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotJob {
    pub kind: EntityKind,
    pub id: String,
    /// `<kind dir>/<id>.yaml`, relative to the repository root.
    pub path: PathBuf,
}

/// Turn the configuration into the ordered job list for a run.
///
/// Playlists come first, then profiles, each in configuration order.
/// Blank entries, repeated ids and ids that would escape the kind's
/// directory are skipped with a warning.
pub fn build_jobs(cfg: &Config) -> Vec<SnapshotJob> {
    let mut jobs = Vec::with_capacity(cfg.playlists.len() + cfg.profiles.len());
    for (kind, ids) in [
        (EntityKind::Playlist, &cfg.playlists),
        (EntityKind::Profile, &cfg.profiles),
    ] {
        let mut seen = HashSet::new();
        for raw in ids {
            let id = raw.trim();
            if id.is_empty() {
                continue;
            }
            if id.contains(['/', '\\']) || id == "." || id == ".." {
                warn!(%kind, id, "skipping identifier that isn't a plain name");
                continue;
            }
            if !seen.insert(id) {
                warn!(%kind, id, "skipping repeated identifier");
                continue;
            }
            jobs.push(SnapshotJob {
                kind,
                id: id.to_string(),
                path: PathBuf::from(kind.dir()).join(format!("{}.yaml", id)),
            });
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn cfg(playlists: &[&str], profiles: &[&str]) -> Config {
        Config {
            playlists: playlists.iter().map(|s| s.to_string()).collect(),
            profiles: profiles.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn playlists_then_profiles_in_config_order() {
        let jobs = build_jobs(&cfg(&["p2", "p1"], &["u1"]));
        let got: Vec<_> = jobs.iter().map(|j| (j.kind, j.id.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (EntityKind::Playlist, "p2"),
                (EntityKind::Playlist, "p1"),
                (EntityKind::Profile, "u1"),
            ]
        );
        assert_eq!(jobs[0].path, Path::new("playlists/p2.yaml"));
        assert_eq!(jobs[2].path, Path::new("profiles/u1.yaml"));
    }

    #[test]
    fn blank_repeated_and_path_like_ids_are_skipped() {
        let jobs = build_jobs(&cfg(&["", "  ", "p1", "p1", "../x", ".."], &[]));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "p1");
    }

    #[test]
    fn same_id_may_appear_in_both_kinds() {
        let jobs = build_jobs(&cfg(&["x"], &["x"]));
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(EntityKind::Playlist.to_string(), "playlist");
        assert_eq!(EntityKind::Profile.dir(), "profiles");
    }
}
