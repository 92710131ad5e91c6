//! Entity fetcher: pulls a playlist or profile from the remote service,
//! following pagination to the end.
//!
//! Every remote call is wrapped in the [`RetryPolicy`]. Calls are issued one
//! after another; nothing here fans out, to stay inside the remote rate limit.
//!
//! A page that still fails after retries fails the whole entity. Pages that
//! were already collected are dropped, so a snapshot is either complete or
//! not written at all.

mod retry;

pub use retry::RetryPolicy;

use tracing::debug;

use crate::error::{ApiError, EntityError};
use crate::run::jobs::EntityKind;
use crate::spotify::model::{RemotePlaylist, RemotePlaylistItem, RemotePlaylistRef, RemoteProfile};
use crate::spotify::{MusicApi, Page, PageCursor};

/// Playlist metadata plus every item across all pages.
#[derive(Debug, Clone)]
pub struct FetchedPlaylist {
    pub playlist: RemotePlaylist,
    pub items: Vec<RemotePlaylistItem>,
}

/// Public profile plus every playlist it owns across all pages.
#[derive(Debug, Clone)]
pub struct FetchedProfile {
    pub profile: RemoteProfile,
    pub playlists: Vec<RemotePlaylistRef>,
}

pub struct Fetcher<'a, A: MusicApi + ?Sized> {
    api: &'a A,
    retry: RetryPolicy,
}

impl<'a, A: MusicApi + ?Sized> Fetcher<'a, A> {
    /// Wrap `api`; every call made through the fetcher is retried per `retry`.
    pub fn new(api: &'a A, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Playlist metadata followed by every item page, in order.
    ///
    /// # Errors
    /// - [`EntityError::Fetch`] if the metadata can't be retrieved.
    /// - [`EntityError::FetchPage`] if any item page still fails after
    ///   retries; items collected so far are discarded.
    pub fn playlist(&self, id: &str) -> Result<FetchedPlaylist, EntityError> {
        let kind = EntityKind::Playlist;
        let playlist = self
            .retry
            .run("playlist", || self.api.playlist(id))
            .map_err(|source| EntityError::Fetch {
                kind,
                id: id.to_string(),
                source,
            })?;
        let items = self.collect_pages(kind, id, |cursor| self.api.playlist_items(id, cursor))?;
        Ok(FetchedPlaylist { playlist, items })
    }

    /// Public profile followed by every page of the user's playlists.
    ///
    /// # Errors
    /// Same as [`Fetcher::playlist`].
    pub fn profile(&self, id: &str) -> Result<FetchedProfile, EntityError> {
        let kind = EntityKind::Profile;
        let profile = self
            .retry
            .run("profile", || self.api.profile(id))
            .map_err(|source| EntityError::Fetch {
                kind,
                id: id.to_string(),
                source,
            })?;
        let playlists =
            self.collect_pages(kind, id, |cursor| self.api.profile_playlists(id, cursor))?;
        Ok(FetchedProfile { profile, playlists })
    }

    /// Request pages until the remote side stops handing out cursors.
    ///
    /// `page` is a 1-based label for logs and errors only; the loop is driven
    /// by the cursor alone.
    fn collect_pages<T>(
        &self,
        kind: EntityKind,
        id: &str,
        mut fetch_page: impl FnMut(Option<&PageCursor>) -> Result<Page<T>, ApiError>,
    ) -> Result<Vec<T>, EntityError> {
        let mut all = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        for page in 1.. {
            let batch = self
                .retry
                .run("page", || fetch_page(cursor.as_ref()))
                .map_err(|source| EntityError::FetchPage {
                    kind,
                    id: id.to_string(),
                    page,
                    source,
                })?;
            debug!(%kind, id, page, items = batch.items.len(), "fetched page");
            all.extend(batch.items);
            match batch.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(all)
    }
}
