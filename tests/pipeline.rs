use git2::Repository;
use spotify_togit::snapshot::{PlaylistSnapshot, ProfileSnapshot, from_yaml};
use spotify_togit::spotify::model::{
    RemotePlaylist, RemotePlaylistItem, RemotePlaylistRef, RemoteProfile, RemoteTrack,
};
use spotify_togit::spotify::{MusicApi, Page, PageCursor};
use spotify_togit::{
    ApiError, CONFIG_PATH, EntityError, INIT_MESSAGE, Pipeline, RUN_MESSAGE, RetryPolicy,
    SnapshotRepo, open_repository,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// In-memory service: playlists are lists of pages, cursors are page indexes.
#[derive(Default)]
struct FakeApi {
    playlists: HashMap<String, Vec<Vec<&'static str>>>,
    /// playlist id -> 0-based index of a page that always fails
    broken_page: HashMap<String, usize>,
    profiles: HashMap<String, Vec<&'static str>>,
}

impl FakeApi {
    fn with_playlist(mut self, id: &str, pages: Vec<Vec<&'static str>>) -> Self {
        self.playlists.insert(id.to_string(), pages);
        self
    }

    fn with_profile(mut self, id: &str, playlist_ids: Vec<&'static str>) -> Self {
        self.profiles.insert(id.to_string(), playlist_ids);
        self
    }

    fn breaking_page(mut self, id: &str, page: usize) -> Self {
        self.broken_page.insert(id.to_string(), page);
        self
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: "not found".into(),
    }
}

fn page_at<T>(
    pages: &[Vec<T>],
    cursor: Option<&PageCursor>,
) -> Result<(usize, Page<T>), ApiError>
where
    T: Clone,
{
    let idx = match cursor {
        None => 0,
        Some(c) => c.0.parse::<usize>().map_err(|e| ApiError::Decode(e.to_string()))?,
    };
    let items = pages.get(idx).cloned().unwrap_or_default();
    let next = (idx + 1 < pages.len()).then(|| PageCursor((idx + 1).to_string()));
    Ok((idx, Page { items, next }))
}

impl MusicApi for FakeApi {
    fn playlist(&self, id: &str) -> Result<RemotePlaylist, ApiError> {
        if !self.playlists.contains_key(id) {
            return Err(not_found());
        }
        Ok(RemotePlaylist {
            id: id.to_string(),
            name: format!("Playlist {id}"),
            public: Some(true),
            snapshot_id: "snap".into(),
            ..Default::default()
        })
    }

    fn playlist_items(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistItem>, ApiError> {
        let pages = self.playlists.get(id).ok_or_else(not_found)?;
        let (idx, page) = page_at(pages, cursor)?;
        if self.broken_page.get(id) == Some(&idx) {
            return Err(not_found());
        }
        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|track_id| RemotePlaylistItem {
                    added_at: Some("2024-01-01T00:00:00Z".into()),
                    track: Some(RemoteTrack {
                        id: Some(track_id.to_string()),
                        name: format!("Track {track_id}"),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .collect(),
            next: page.next,
        })
    }

    fn profile(&self, id: &str) -> Result<RemoteProfile, ApiError> {
        if !self.profiles.contains_key(id) {
            return Err(not_found());
        }
        Ok(RemoteProfile {
            id: id.to_string(),
            display_name: Some(id.to_uppercase()),
            uri: format!("spotify:user:{id}"),
            ..Default::default()
        })
    }

    fn profile_playlists(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistRef>, ApiError> {
        let ids = self.profiles.get(id).ok_or_else(not_found)?;
        if cursor.is_some() {
            return Err(ApiError::Decode("unexpected cursor".into()));
        }
        Ok(Page::last(
            ids.iter()
                .map(|pid| RemotePlaylistRef {
                    id: pid.to_string(),
                    name: format!("Playlist {pid}"),
                })
                .collect(),
        ))
    }
}

fn write_config(dir: &Path, text: &str) {
    fs::write(dir.join(CONFIG_PATH), text).unwrap();
}

fn commit_messages(dir: &Path) -> Vec<String> {
    let repo = Repository::open(dir).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.map(|oid| {
        let c = repo.find_commit(oid.unwrap()).unwrap();
        c.message().unwrap_or_default().to_string()
    })
    .collect()
}

fn head_tree_matches_parent(dir: &Path) -> bool {
    let repo = Repository::open(dir).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let parent = head.parent(0).unwrap();
    head.tree_id() == parent.tree_id()
}

fn run(repo: &SnapshotRepo, api: &FakeApi) -> spotify_togit::RunSummary {
    Pipeline::new(repo, api, RetryPolicy::immediate(3))
        .run()
        .unwrap()
}

#[test]
fn bootstrap_commit_comes_before_any_run() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    assert_eq!(commit_messages(td.path()), vec![INIT_MESSAGE]);

    let summary = run(&repo, &FakeApi::default());
    assert_eq!(summary.updated, 0);
    assert!(summary.failures.is_empty());
    assert_eq!(commit_messages(td.path()), vec![RUN_MESSAGE, INIT_MESSAGE]);
    assert!(td.path().join("playlists").is_dir());
    assert!(td.path().join("profiles").is_dir());
}

#[test]
fn paginated_playlist_is_written_whole_in_one_commit() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Playlists:\n- p1\n");

    let api = FakeApi::default().with_playlist("p1", vec![vec!["t1"], vec!["t2"]]);
    let summary = run(&repo, &api);
    assert_eq!(summary.updated, 1);

    let text = fs::read_to_string(td.path().join("playlists/p1.yaml")).unwrap();
    assert!(text.ends_with('\n') && !text.ends_with("\n\n"));
    let snap: PlaylistSnapshot = from_yaml(&text).unwrap();
    assert_eq!(snap.id, "p1");
    let ids: Vec<_> = snap
        .tracks
        .iter()
        .map(|t| t.track.as_ref().unwrap().id.as_str())
        .collect();
    assert_eq!(ids, vec!["t1", "t2"]);

    assert_eq!(commit_messages(td.path()).len(), 2);
    let raw = Repository::open(td.path()).unwrap();
    let tree = raw.head().unwrap().peel_to_tree().unwrap();
    assert!(tree.get_path(Path::new("playlists/p1.yaml")).is_ok());
    assert!(tree.get_path(Path::new(CONFIG_PATH)).is_ok());
}

#[test]
fn one_failing_identifier_does_not_stop_the_others() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(
        td.path(),
        "Playlists:\n- gone\n- p1\nProfiles:\n- u1\n",
    );

    let api = FakeApi::default()
        .with_playlist("p1", vec![vec!["t1"]])
        .with_profile("u1", vec!["p1", "p9"]);
    let summary = run(&repo, &api);

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id(), "gone");
    assert!(matches!(summary.failures[0], EntityError::Fetch { .. }));

    assert!(!td.path().join("playlists/gone.yaml").exists());
    let profile: ProfileSnapshot =
        from_yaml(&fs::read_to_string(td.path().join("profiles/u1.yaml")).unwrap()).unwrap();
    assert_eq!(profile.profile.display_name, "U1");
    assert_eq!(profile.playlists.len(), 2);
    assert_eq!(commit_messages(td.path()).len(), 2);
}

#[test]
fn unchanged_run_still_commits_with_identical_tree() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Playlists:\n- p1\n");
    let api = FakeApi::default().with_playlist("p1", vec![vec!["t1", "t2"]]);

    run(&repo, &api);
    let summary = run(&repo, &api);

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(
        commit_messages(td.path()),
        vec![RUN_MESSAGE, RUN_MESSAGE, INIT_MESSAGE]
    );
    assert!(head_tree_matches_parent(td.path()));
}

#[test]
fn failed_page_keeps_previous_snapshot() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Playlists:\n- p1\n");

    run(&repo, &FakeApi::default().with_playlist("p1", vec![vec!["t1"]]));
    let before = fs::read_to_string(td.path().join("playlists/p1.yaml")).unwrap();

    let api = FakeApi::default()
        .with_playlist("p1", vec![vec!["t1"], vec!["t2"], vec!["t3"]])
        .breaking_page("p1", 1);
    let summary = run(&repo, &api);

    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(
        summary.failures[0],
        EntityError::FetchPage { page: 2, .. }
    ));
    let after = fs::read_to_string(td.path().join("playlists/p1.yaml")).unwrap();
    assert_eq!(before, after);
    assert!(head_tree_matches_parent(td.path()));
}

#[test]
fn config_edits_are_committed_by_the_next_run() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Profiles:\n- u1\n");

    run(&repo, &FakeApi::default().with_profile("u1", vec![]));

    let raw = Repository::open(td.path()).unwrap();
    let tree = raw.head().unwrap().peel_to_tree().unwrap();
    let entry = tree.get_path(Path::new(CONFIG_PATH)).unwrap();
    let blob = raw.find_blob(entry.id()).unwrap();
    assert_eq!(blob.content(), b"Profiles:\n- u1\n");
}

#[test]
fn malformed_config_is_fatal_and_commits_nothing() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Playlists: {broken\n");

    let err = Pipeline::new(&repo, &FakeApi::default(), RetryPolicy::immediate(1))
        .run()
        .unwrap_err();
    assert!(matches!(err, spotify_togit::RunError::ConfigParse(_)), "{err}");
    assert_eq!(commit_messages(td.path()), vec![INIT_MESSAGE]);
}

#[test]
fn unwritable_snapshot_is_reported_and_others_still_commit() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    write_config(td.path(), "Playlists:\n- x\n- p1\n");
    fs::create_dir_all(td.path().join("playlists/x.yaml")).unwrap();

    let api = FakeApi::default()
        .with_playlist("x", vec![vec!["t1"]])
        .with_playlist("p1", vec![vec!["t2"]]);
    let summary = run(&repo, &api);

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id(), "x");
    assert!(matches!(summary.failures[0], EntityError::Store { .. }));

    assert_eq!(commit_messages(td.path()), vec![RUN_MESSAGE, INIT_MESSAGE]);
    let raw = Repository::open(td.path()).unwrap();
    let tree = raw.head().unwrap().peel_to_tree().unwrap();
    assert!(tree.get_path(Path::new("playlists/p1.yaml")).is_ok());
    assert!(tree.get_path(Path::new("playlists/x.yaml")).is_err());
}

#[test]
fn invalid_utf8_config_is_fatal_and_commits_nothing() {
    let td = tempdir().unwrap();
    let repo = open_repository(td.path()).unwrap();
    fs::write(td.path().join(CONFIG_PATH), b"Playlists:\n- p\xff1\n").unwrap();

    let api = FakeApi::default().with_playlist("p1", vec![vec!["t1"]]);
    let err = Pipeline::new(&repo, &api, RetryPolicy::immediate(1))
        .run()
        .unwrap_err();
    assert!(matches!(err, spotify_togit::RunError::ConfigEncoding(_)), "{err}");
    assert_eq!(commit_messages(td.path()), vec![INIT_MESSAGE]);
}
