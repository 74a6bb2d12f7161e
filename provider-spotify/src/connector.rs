//! Spotify Web API connector
//!
//! Implements [`PlaylistSource`] and [`UserDirectory`] on top of the
//! client-credentials flow. No user login is involved; the bot only reads a
//! public (or collaborative) playlist and public profiles.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::playlist::{PlaylistSource, PlaylistTrack, UserDirectory, UserProfile};
use core_async::sync::{Mutex, RwLock};
use core_async::time::{Duration, Instant};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SpotifyError};
use crate::types::{
    ApiErrorResponse, AuthErrorResponse, PlaylistItem, PlaylistTracksPage, PublicUser,
    TokenResponse,
};

/// Accounts service token endpoint
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Web API base URL
const API_BASE: &str = "https://api.spotify.com/v1";

/// Public profile page, used when the API cannot describe a user
const PROFILE_URL_BASE: &str = "https://open.spotify.com/user";

/// Maximum items per playlist page (API limit)
const PAGE_SIZE: u32 = 100;

/// Tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Extracts the playlist id from a raw id, an `open.spotify.com` URL or a
/// `spotify:playlist:` URI.
///
/// ```
/// use provider_spotify::parse_playlist_id;
///
/// let id = parse_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd?si=abc").unwrap();
/// assert_eq!(id, "37i9dQZF1DX0XUsuxWHRQd");
/// ```
pub fn parse_playlist_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let candidate = if let Some((_, rest)) = trimmed.split_once("playlist/") {
        rest.split(['?', '/', '#']).next().unwrap_or_default()
    } else if let Some(rest) = trimmed.strip_prefix("spotify:playlist:") {
        rest
    } else {
        trimmed
    };

    if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SpotifyError::InvalidPlaylist(raw.to_string()));
    }
    Ok(candidate.to_string())
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Spotify Web API connector
///
/// # Features
///
/// - Client-credentials token, cached until shortly before it expires
/// - Playlist pages of 100 items; the API's `next` URL is the cursor
/// - Contributor profiles cached for the lifetime of the process
/// - One transparent re-authentication when the API answers 401
///
/// # Example
///
/// ```ignore
/// use provider_spotify::SpotifyConnector;
/// use bridge_traits::playlist::PlaylistSource;
///
/// let connector = SpotifyConnector::new(http_client, client_id, client_secret, playlist_url)?;
/// let (tracks, next_cursor) = connector.list_tracks(None).await?;
/// ```
pub struct SpotifyConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    client_id: String,
    client_secret: String,

    playlist_id: String,

    token: Mutex<Option<CachedToken>>,

    /// Resolved profiles by user id, including fallbacks
    users: RwLock<HashMap<String, UserProfile>>,
}

impl SpotifyConnector {
    /// Create a new connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `client_id` / `client_secret` - application credentials
    /// * `playlist` - playlist id or share URL
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        playlist: &str,
    ) -> Result<Self> {
        Ok(Self {
            http_client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            playlist_id: parse_playlist_id(playlist)?,
            token: Mutex::new(None),
            users: RwLock::new(HashMap::new()),
        })
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/playlists/{}/tracks?limit={}&offset=0",
            API_BASE,
            urlencoding::encode(&self.playlist_id),
            PAGE_SIZE
        )
    }

    /// Returns a valid access token, requesting a new one when the cached
    /// token is missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let access_token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            refresh_at: Instant::now() + lifetime,
        });
        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    #[instrument(skip(self))]
    async fn request_token(&self) -> Result<TokenResponse> {
        let request = HttpRequest::new(HttpMethod::Post, TOKEN_URL)
            .basic_auth(&self.client_id, &self.client_secret)
            .form(&[("grant_type", "client_credentials")]);

        let response = self.http_client.execute(request).await?;

        if response.status == 400 || response.status == 401 {
            let reason = serde_json::from_slice::<AuthErrorResponse>(&response.body)
                .map(|body| match body.error_description {
                    Some(description) => format!("{}: {}", body.error, description),
                    None => body.error,
                })
                .unwrap_or_else(|_| format!("HTTP {}", response.status));
            return Err(SpotifyError::AuthenticationFailed(reason));
        }
        if !response.is_success() {
            return Err(api_error(&response));
        }

        let token: TokenResponse = parse_body(&response)?;
        info!(expires_in = token.expires_in, "Obtained Spotify access token");
        Ok(token)
    }

    /// GET `url` with the bearer token; re-authenticates once on 401.
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .execute(HttpRequest::new(HttpMethod::Get, url).bearer_token(token))
            .await?;

        if response.status != 401 {
            return Ok(response);
        }

        warn!("Spotify rejected the cached token, re-authenticating");
        self.invalidate_token().await;
        let token = self.access_token().await?;
        Ok(self
            .http_client
            .execute(HttpRequest::new(HttpMethod::Get, url).bearer_token(token))
            .await?)
    }

    #[instrument(skip(self), fields(playlist_id = %self.playlist_id))]
    async fn fetch_page(&self, url: &str) -> Result<PlaylistTracksPage> {
        let response = self.get(url).await?;

        if response.status == 404 {
            return Err(SpotifyError::PlaylistNotFound {
                playlist_id: self.playlist_id.clone(),
            });
        }
        if !response.is_success() {
            return Err(api_error(&response));
        }

        parse_body(&response)
    }

    #[instrument(skip(self))]
    async fn fetch_user(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!("{}/users/{}", API_BASE, urlencoding::encode(user_id));
        let response = self.get(&url).await?;

        if !response.is_success() {
            return Err(api_error(&response));
        }

        let user: PublicUser = parse_body(&response)?;
        Ok(UserProfile {
            display_name: user.display_name.unwrap_or_else(|| user.id.clone()),
            profile_url: user
                .external_urls
                .spotify
                .unwrap_or_else(|| fallback_profile_url(&user.id)),
            id: user.id,
        })
    }
}

fn fallback_profile_url(user_id: &str) -> String {
    format!("{}/{}", PROFILE_URL_BASE, user_id)
}

fn fallback_profile(user_id: &str) -> UserProfile {
    UserProfile {
        id: user_id.to_string(),
        display_name: user_id.to_string(),
        profile_url: fallback_profile_url(user_id),
    }
}

fn parse_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| SpotifyError::ParseError(e.to_string()))
}

fn api_error(response: &HttpResponse) -> SpotifyError {
    let message = serde_json::from_slice::<ApiErrorResponse>(&response.body)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());
    SpotifyError::ApiError {
        status_code: response.status,
        message,
    }
}

/// Converts one API page item; `None` for unavailable tracks.
fn convert_item(item: PlaylistItem, position: u32) -> Option<PlaylistTrack> {
    let track = item.track?;
    Some(PlaylistTrack {
        title: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        duration_ms: track.duration_ms,
        album_art_url: track
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url),
        added_by: item.added_by.map(|user| user.id).filter(|id| !id.is_empty()),
        position,
    })
}

#[async_trait]
impl PlaylistSource for SpotifyConnector {
    async fn list_tracks(
        &self,
        cursor: Option<String>,
    ) -> BridgeResult<(Vec<PlaylistTrack>, Option<String>)> {
        let url = cursor.unwrap_or_else(|| self.first_page_url());
        let page = self.fetch_page(&url).await?;

        let offset = page.offset;
        let item_count = page.items.len();
        let tracks: Vec<PlaylistTrack> = page
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| convert_item(item, offset + index as u32 + 1))
            .collect();

        debug!(
            offset,
            items = item_count,
            playable = tracks.len(),
            total = page.total,
            has_more = page.next.is_some(),
            "Fetched playlist page"
        );

        Ok((tracks, page.next))
    }
}

#[async_trait]
impl UserDirectory for SpotifyConnector {
    async fn resolve(&self, user_id: &str) -> BridgeResult<UserProfile> {
        if let Some(profile) = self.users.read().await.get(user_id) {
            return Ok(profile.clone());
        }

        let profile = match self.fetch_user(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "Could not resolve Spotify user, using fallback");
                fallback_profile(user_id)
            }
        };

        self.users
            .write()
            .await
            .insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result};
    use bytes::Bytes;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn token_body(expires_in: u64) -> String {
        format!(
            r#"{{"access_token": "tok", "token_type": "Bearer", "expires_in": {}}}"#,
            expires_in
        )
    }

    fn connector(mock: MockHttpClient) -> SpotifyConnector {
        SpotifyConnector::new(Arc::new(mock), "id", "secret", "PL1").unwrap()
    }

    const PAGE_ONE: &str = r#"{
        "items": [
            {"added_by": {"id": "alice"}, "track": {"name": "First", "duration_ms": 200000,
              "artists": [{"name": "Artist A"}, {"name": "Artist B"}],
              "album": {"images": [{"url": "https://img/large"}, {"url": "https://img/small"}]}}},
            {"added_by": {"id": "bob"}, "track": null},
            {"added_by": {"id": ""}, "track": {"name": "Third", "duration_ms": 1000,
              "artists": [], "album": {"images": []}}}
        ],
        "next": "https://api.spotify.com/v1/playlists/PL1/tracks?offset=100&limit=100",
        "offset": 0,
        "total": 103
    }"#;

    #[test]
    fn test_parse_playlist_id() {
        assert_eq!(parse_playlist_id("PL1").unwrap(), "PL1");
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/playlist/abc123?si=xyz").unwrap(),
            "abc123"
        );
        assert_eq!(parse_playlist_id("spotify:playlist:abc123").unwrap(), "abc123");
        assert!(parse_playlist_id("").is_err());
        assert!(parse_playlist_id("https://open.spotify.com/playlist/").is_err());
        assert!(parse_playlist_id("not a playlist").is_err());
    }

    #[core_async::test]
    async fn test_list_tracks_first_page() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(2).returning(|req| {
            if req.url == TOKEN_URL {
                assert!(req.headers["Authorization"].starts_with("Basic "));
                return Ok(response(200, &token_body(3600)));
            }
            assert!(req.url.contains("/playlists/PL1/tracks?limit=100&offset=0"));
            assert_eq!(req.headers["Authorization"], "Bearer tok");
            Ok(response(200, PAGE_ONE))
        });

        let (tracks, next) = connector(mock).list_tracks(None).await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "First");
        assert_eq!(tracks[0].position, 1);
        assert_eq!(tracks[0].primary_artist(), "Artist A");
        assert_eq!(tracks[0].album_art_url.as_deref(), Some("https://img/large"));
        assert_eq!(tracks[0].added_by.as_deref(), Some("alice"));
        // The unavailable item still occupies position 2.
        assert_eq!(tracks[1].title, "Third");
        assert_eq!(tracks[1].position, 3);
        assert_eq!(tracks[1].added_by, None);
        assert_eq!(tracks[1].album_art_url, None);
        assert!(next.unwrap().contains("offset=100"));
    }

    #[core_async::test]
    async fn test_list_tracks_follows_cursor_with_offset() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            assert_eq!(req.url, "https://api.spotify.com/v1/next-page");
            Ok(response(
                200,
                r#"{"items": [{"added_by": null, "track": {"name": "Late", "artists": [{"name": "Z"}]}}],
                    "next": null, "offset": 100, "total": 101}"#,
            ))
        });

        let (tracks, next) = connector(mock)
            .list_tracks(Some("https://api.spotify.com/v1/next-page".to_string()))
            .await
            .unwrap();

        assert_eq!(tracks[0].position, 101);
        assert!(next.is_none());
    }

    #[core_async::test]
    async fn test_missing_playlist_maps_to_not_found() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            Ok(response(
                404,
                r#"{"error": {"status": 404, "message": "Resource not found"}}"#,
            ))
        });

        let result = connector(mock).list_tracks(None).await;

        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }

    #[core_async::test]
    async fn test_rejected_credentials() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                400,
                r#"{"error": "invalid_client", "error_description": "Invalid client secret"}"#,
            ))
        });

        let err = connector(mock).list_tracks(None).await.unwrap_err();

        assert!(err.to_string().contains("invalid_client"));
    }

    #[core_async::test(start_paused)]
    async fn test_token_cached_until_refresh_margin() {
        let token_requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&token_requests);

        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(move |req| {
            if req.url == TOKEN_URL {
                counter.fetch_add(1, Ordering::SeqCst);
                return Ok(response(200, &token_body(120)));
            }
            Ok(response(200, r#"{"items": [], "next": null, "offset": 0}"#))
        });
        let connector = connector(mock);

        connector.list_tracks(None).await.unwrap();
        connector.list_tracks(None).await.unwrap();
        assert_eq!(token_requests.load(Ordering::SeqCst), 1);

        // 120 s lifetime minus the 60 s margin.
        core_async::time::sleep(Duration::from_secs(61)).await;
        connector.list_tracks(None).await.unwrap();
        assert_eq!(token_requests.load(Ordering::SeqCst), 2);
    }

    #[core_async::test]
    async fn test_reauthenticates_once_on_401() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(4).returning(move |req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(response(401, r#"{"error": {"status": 401, "message": "expired"}}"#));
            }
            Ok(response(200, r#"{"items": [], "next": null, "offset": 0}"#))
        });

        let (tracks, _) = connector(mock).list_tracks(None).await.unwrap();

        assert!(tracks.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[core_async::test]
    async fn test_resolve_user_is_cached() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(2).returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            assert!(req.url.ends_with("/users/alice"));
            Ok(response(
                200,
                r#"{"id": "alice", "display_name": "Alice",
                    "external_urls": {"spotify": "https://open.spotify.com/user/alice"}}"#,
            ))
        });
        let connector = connector(mock);

        let first = connector.resolve("alice").await.unwrap();
        let second = connector.resolve("alice").await.unwrap();

        assert_eq!(first.display_name, "Alice");
        assert_eq!(first.profile_url, "https://open.spotify.com/user/alice");
        assert_eq!(first, second);
    }

    #[core_async::test]
    async fn test_resolve_user_without_display_name() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            Ok(response(200, r#"{"id": "carol"}"#))
        });

        let profile = connector(mock).resolve("carol").await.unwrap();

        assert_eq!(profile.display_name, "carol");
        assert_eq!(profile.profile_url, "https://open.spotify.com/user/carol");
    }

    #[core_async::test]
    async fn test_resolve_failure_falls_back_and_caches() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(2).returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(response(200, &token_body(3600)));
            }
            Err(BridgeError::OperationFailed("connection reset".to_string()))
        });
        let connector = connector(mock);

        let profile = connector.resolve("dave").await.unwrap();
        let again = connector.resolve("dave").await.unwrap();

        assert_eq!(profile.display_name, "dave");
        assert_eq!(profile.profile_url, "https://open.spotify.com/user/dave");
        assert_eq!(again, profile);
    }
}
