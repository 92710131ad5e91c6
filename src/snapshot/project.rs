use crate::fetch::{FetchedPlaylist, FetchedProfile};
use crate::spotify::model::{RemoteArtist, RemoteImage, RemotePlaylistItem, RemoteTrack};

use super::{Artist, Image, PlaylistRef, PlaylistSnapshot, PlaylistTrack, Profile, ProfileSnapshot, Track};

/// Reduce a fetched playlist to the persisted allow-list.
///
/// `added_by` is flattened to the user id and each track keeps only id, name,
/// artists and external URLs. Item order is preserved.
pub fn project_playlist(fetched: &FetchedPlaylist) -> PlaylistSnapshot {
    let pl = &fetched.playlist;
    PlaylistSnapshot {
        id: pl.id.clone(),
        name: pl.name.clone(),
        public: pl.public,
        collaborative: pl.collaborative,
        description: pl.description.clone().unwrap_or_default(),
        images: images(pl.images.as_deref()),
        snapshot_id: pl.snapshot_id.clone(),
        followers: pl.followers.as_ref().map(|f| f.total).unwrap_or(0),
        tracks: fetched.items.iter().map(playlist_track).collect(),
    }
}

/// Keep the profile as reported and replace its playlists with id + name.
pub fn project_profile(fetched: &FetchedProfile) -> ProfileSnapshot {
    let pf = &fetched.profile;
    ProfileSnapshot {
        profile: Profile {
            id: pf.id.clone(),
            display_name: pf.display_name.clone().unwrap_or_default(),
            external_urls: pf.external_urls.clone(),
            followers: pf.followers.as_ref().map(|f| f.total).unwrap_or(0),
            href: pf.href.clone(),
            images: images(pf.images.as_deref()),
            uri: pf.uri.clone(),
        },
        playlists: fetched
            .playlists
            .iter()
            .map(|p| PlaylistRef {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect(),
    }
}

fn playlist_track(item: &RemotePlaylistItem) -> PlaylistTrack {
    PlaylistTrack {
        added_at: item.added_at.clone().unwrap_or_default(),
        added_by: item
            .added_by
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_default(),
        is_local: item.is_local,
        track: item.track.as_ref().map(track),
    }
}

fn track(t: &RemoteTrack) -> Track {
    Track {
        id: t.id.clone().unwrap_or_default(),
        name: t.name.clone(),
        artists: t.artists.iter().map(artist).collect(),
        external_urls: t.external_urls.clone(),
    }
}

fn artist(a: &RemoteArtist) -> Artist {
    Artist {
        id: a.id.clone().unwrap_or_default(),
        name: a.name.clone(),
        external_urls: a.external_urls.clone(),
    }
}

fn images(remote: Option<&[RemoteImage]>) -> Vec<Image> {
    remote
        .unwrap_or_default()
        .iter()
        .map(|i| Image {
            url: i.url.clone(),
            height: i.height,
            width: i.width,
        })
        .collect()
}
