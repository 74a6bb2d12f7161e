//! LRCLib provider: free, keyless lyrics database.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::Deserialize;

use crate::error::{MetadataError, Result};
use crate::lyrics::{LyricsProvider, LyricsQuery, LyricsSource};

const API_BASE: &str = "https://lrclib.net/api";

pub struct LrcLibProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl LrcLibProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl LyricsProvider for LrcLibProvider {
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.title)
        );
        if let Some(duration) = query.duration_secs {
            url.push_str(&format!("&duration={}", duration));
        }

        let response = self
            .http_client
            .execute(HttpRequest::new(HttpMethod::Get, url))
            .await?;

        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(MetadataError::LyricsFetchFailed(format!(
                "LRCLib API error: HTTP {}",
                response.status
            )));
        }

        let body: LrcLibResponse = response
            .json()
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;

        // Plain text reads better in chat than timestamped LRC.
        let text = body
            .plain_lyrics
            .filter(|text| !text.trim().is_empty())
            .or_else(|| body.synced_lyrics.map(|lrc| strip_timestamps(&lrc)))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Ok(text)
    }

    fn source(&self) -> LyricsSource {
        LyricsSource::LrcLib
    }
}

/// Drops leading `[mm:ss.xx]` tags from every LRC line.
fn strip_timestamps(lrc: &str) -> String {
    lrc.lines()
        .map(|line| {
            let mut rest = line;
            while rest.starts_with('[') {
                match rest.find(']') {
                    Some(end) => rest = &rest[end + 1..],
                    None => break,
                }
            }
            rest.trim_start()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct LrcLibResponse {
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_strip_timestamps() {
        assert_eq!(
            strip_timestamps("[00:12.50] Hello\n[00:15.00][00:40.00]Again\nplain"),
            "Hello\nAgain\nplain"
        );
    }

    #[core_async::test]
    async fn test_fetch_prefers_plain_lyrics() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.url
                    == "https://lrclib.net/api/get?artist_name=The%20Artist&track_name=A%20Song&duration=200"
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"plainLyrics": "Hello\nWorld\n", "syncedLyrics": "[00:01.00] Hello"}"#,
                ))
            });

        let provider = LrcLibProvider::new(Arc::new(http));
        let query = LyricsQuery::new("A Song", "The Artist").with_duration_secs(200);

        assert_eq!(
            provider.fetch(&query).await.unwrap().as_deref(),
            Some("Hello\nWorld")
        );
    }

    #[core_async::test]
    async fn test_fetch_falls_back_to_synced() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(response(
                200,
                r#"{"plainLyrics": null, "syncedLyrics": "[00:01.00] Hello\n[00:02.00] World"}"#,
            ))
        });

        let provider = LrcLibProvider::new(Arc::new(http));
        let lyrics = provider
            .fetch(&LyricsQuery::new("Song", "Artist"))
            .await
            .unwrap();

        assert_eq!(lyrics.as_deref(), Some("Hello\nWorld"));
    }

    #[core_async::test]
    async fn test_not_found() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, r#"{"code": 404}"#)));

        let provider = LrcLibProvider::new(Arc::new(http));
        let lyrics = provider.fetch(&LyricsQuery::new("Song", "Artist")).await;

        assert!(matches!(lyrics, Ok(None)));
    }

    #[core_async::test]
    async fn test_server_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "oops")));

        let provider = LrcLibProvider::new(Arc::new(http));
        let result = provider.fetch(&LyricsQuery::new("Song", "Artist")).await;

        assert!(matches!(result, Err(MetadataError::LyricsFetchFailed(_))));
    }
}
