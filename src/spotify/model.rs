//! Wire types for the subset of the Spotify Web API the pipeline reads.
//!
//! Everything is lenient: missing or `null` values fall back to defaults so a
//! sparse `fields=` response still decodes.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteImage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteFollowers {
    #[serde(default)]
    pub total: u64,
}

/// `GET /playlists/{id}` restricted by a `fields` allow-list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePlaylist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<RemoteImage>>,
    #[serde(default)]
    pub snapshot_id: String,
    #[serde(default)]
    pub followers: Option<RemoteFollowers>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteUserRef {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteArtist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub external_urls: BTreeMap<String, String>,
}

/// A track (or episode) as embedded in a playlist item. Local files have no id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RemoteArtist>,
    #[serde(default)]
    pub external_urls: BTreeMap<String, String>,
}

/// One entry of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub added_by: Option<RemoteUserRef>,
    #[serde(default)]
    pub is_local: bool,
    /// `null` when the track was removed from the catalogue.
    #[serde(default)]
    pub track: Option<RemoteTrack>,
}

/// `GET /users/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub external_urls: BTreeMap<String, String>,
    #[serde(default)]
    pub followers: Option<RemoteFollowers>,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub images: Option<Vec<RemoteImage>>,
    #[serde(default)]
    pub uri: String,
}

/// Simplified playlist as listed by `GET /users/{id}/playlists`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePlaylistRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Paging envelope shared by all collection endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    #[serde(
        default = "Vec::new",
        deserialize_with = "skip_nulls",
        bound(deserialize = "T: Deserialize<'de>")
    )]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Collection endpoints occasionally return `null` in place of an item
/// (e.g. a deleted playlist in a user's listing). Those are dropped.
fn skip_nulls<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(d)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
