//! Remote music service capability.
//!
//! The pipeline only depends on [`MusicApi`]; [`SpotifyClient`] is the
//! production implementation against the Spotify Web API. Tests plug in
//! in-memory fakes.

mod client;
pub mod model;

pub use client::{Credentials, Endpoints, SpotifyClient};

use crate::error::ApiError;
use model::{RemotePlaylist, RemotePlaylistItem, RemotePlaylistRef, RemoteProfile};

/// Opaque position in a paginated collection, owned by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub String);

/// One chunk of a paginated collection.
///
/// `next` is `None` when the remote side signals there are no more pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    /// A page with nothing after it.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Calls the pipeline makes against the remote service.
///
/// Paginated calls take `None` for the first page and the cursor returned by
/// the previous page afterwards. Implementations perform exactly one request
/// per call; retrying is the caller's business.
pub trait MusicApi {
    fn playlist(&self, id: &str) -> Result<RemotePlaylist, ApiError>;

    fn playlist_items(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistItem>, ApiError>;

    fn profile(&self, id: &str) -> Result<RemoteProfile, ApiError>;

    fn profile_playlists(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistRef>, ApiError>;
}
