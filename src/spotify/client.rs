use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::model::{
    Paging, RemotePlaylist, RemotePlaylistItem, RemotePlaylistRef, RemoteProfile,
};
use super::{MusicApi, Page, PageCursor};
use crate::error::ApiError;

/// Playlist metadata allow-list. Tracks are fetched separately.
const PLAYLIST_FIELDS: &str =
    "id,name,collaborative,images,owner(id,display_name),public,snapshot_id,description,followers";

/// Playlist item allow-list. The album object is the bulk of the payload and
/// isn't persisted.
const ITEM_FIELDS: &str = "next,items(added_at,added_by(id),is_local,track(!album))";

const ITEMS_PAGE_LIMIT: &str = "100";
const PLAYLISTS_PAGE_LIMIT: &str = "50";

/// Client-credentials pair for the Spotify accounts service.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Where to talk to. Overridable from the settings file (proxies, tests).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_base: String,
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Blocking Spotify Web API client authorized with an app-only token.
///
/// One token is requested per [`SpotifyClient::connect`]; the scheduler
/// connects once per run, so tokens never outlive their one-hour validity.
pub struct SpotifyClient {
    http: Client,
    api_base: Url,
    token: String,
}

impl SpotifyClient {
    /// Build the HTTP client and obtain an access token via the
    /// client-credentials grant.
    ///
    /// # Errors
    /// - [`ApiError::InvalidUrl`] if `endpoints.api_base` isn't a usable base URL.
    /// - Transport/status errors from the token request.
    /// - [`ApiError::Token`] if the accounts service returns no token.
    pub fn connect(creds: &Credentials, endpoints: &Endpoints) -> Result<Self, ApiError> {
        let api_base = Url::parse(endpoints.api_base.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoints.api_base, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(endpoints.api_base.clone()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("spotify-togit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let resp = http
            .post(&endpoints.token_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()?;
        let token: TokenResponse = decode(resp)?;
        if token.access_token.is_empty() {
            return Err(ApiError::Token(
                "accounts service returned an empty access token".to_string(),
            ));
        }
        debug!("obtained access token");

        Ok(Self {
            http,
            api_base,
            token: token.access_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()?;
        decode(resp)
    }

    /// First page comes from `first` + `query`; later pages from the cursor,
    /// which already carries its own query string.
    fn page<T: DeserializeOwned>(
        &self,
        first: Url,
        query: &[(&str, &str)],
        cursor: Option<&PageCursor>,
    ) -> Result<Page<T>, ApiError> {
        let paging: Paging<T> = match cursor {
            None => self.get(first, query)?,
            Some(PageCursor(next)) => {
                let url = Url::parse(next)
                    .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", next, e)))?;
                self.get(url, &[])?
            }
        };
        Ok(Page {
            items: paging.items,
            next: paging.next.map(PageCursor),
        })
    }
}

impl MusicApi for SpotifyClient {
    fn playlist(&self, id: &str) -> Result<RemotePlaylist, ApiError> {
        let url = self.endpoint(&["playlists", id])?;
        self.get(url, &[("fields", PLAYLIST_FIELDS)])
    }

    fn playlist_items(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistItem>, ApiError> {
        let url = self.endpoint(&["playlists", id, "tracks"])?;
        self.page(
            url,
            &[("fields", ITEM_FIELDS), ("limit", ITEMS_PAGE_LIMIT)],
            cursor,
        )
    }

    fn profile(&self, id: &str) -> Result<RemoteProfile, ApiError> {
        let url = self.endpoint(&["users", id])?;
        self.get(url, &[])
    }

    fn profile_playlists(
        &self,
        id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemotePlaylistRef>, ApiError> {
        let url = self.endpoint(&["users", id, "playlists"])?;
        self.page(url, &[("limit", PLAYLISTS_PAGE_LIMIT)], cursor)
    }
}

/// Map an HTTP response to a decoded body or a classified [`ApiError`].
fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ApiError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>().map_err(|e| {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e)
        }
    })
}
