//! Genius lyrics provider
//!
//! The Genius API only returns song pages; the lyrics themselves are scraped
//! from the page's `data-lyrics-container` blocks.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use scraper::{Html, Node, Selector};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};
use crate::lyrics::{strip_embed_marker, LyricsProvider, LyricsQuery, LyricsSource};

const API_BASE: &str = "https://api.genius.com";

const LYRICS_CONTAINER: &str = r#"div[data-lyrics-container="true"]"#;

/// Song pages reject requests without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub struct GeniusProvider {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
}

impl GeniusProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            base_url: API_BASE.to_string(),
        }
    }

    /// URL of the best matching song page.
    async fn search(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&format!("{} {}", query.title, query.artist))
        );
        let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(&self.access_token);
        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(MetadataError::LyricsFetchFailed(format!(
                "Genius API error: HTTP {}",
                response.status
            )));
        }

        let search: SearchResponse = response
            .json()
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;
        Ok(best_match(search.response.hits, &query.artist))
    }

    async fn scrape(&self, page_url: &str) -> Result<Option<String>> {
        let request =
            HttpRequest::new(HttpMethod::Get, page_url).header("User-Agent", USER_AGENT);
        let response = self.http_client.execute(request).await?;

        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(MetadataError::LyricsFetchFailed(format!(
                "Genius page error: HTTP {}",
                response.status
            )));
        }

        let html = response.text()?;
        let text = extract_lyrics(&html)?;
        Ok(Some(text).filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl LyricsProvider for GeniusProvider {
    #[instrument(skip_all, fields(title = %query.title))]
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let Some(page_url) = self.search(query).await? else {
            debug!("No Genius song matched");
            return Ok(None);
        };
        debug!(url = %page_url, "Scraping Genius page");
        self.scrape(&page_url).await
    }

    fn source(&self) -> LyricsSource {
        LyricsSource::Genius
    }
}

/// First song hit by `artist`, else the first song hit.
fn best_match(hits: Vec<SearchHit>, artist: &str) -> Option<String> {
    let artist = artist.to_lowercase();
    let songs: Vec<SongResult> = hits
        .into_iter()
        .filter(|hit| hit.kind == "song")
        .map(|hit| hit.result)
        .collect();

    songs
        .iter()
        .find(|song| {
            song.primary_artist
                .as_ref()
                .map(|a| a.name.to_lowercase().contains(&artist))
                .unwrap_or(false)
        })
        .or_else(|| songs.first())
        .map(|song| song.url.clone())
}

/// Text of every lyrics container, `<br>` as newlines, Embed marker removed.
pub(crate) fn extract_lyrics(html: &str) -> Result<String> {
    let selector =
        Selector::parse(LYRICS_CONTAINER).map_err(|e| MetadataError::ParseError(e.to_string()))?;
    let document = Html::parse_document(html);

    let mut blocks = Vec::new();
    for container in document.select(&selector) {
        let mut block = String::new();
        for node in container.descendants() {
            match node.value() {
                Node::Text(text) => block.push_str(text),
                Node::Element(element) if element.name() == "br" => block.push('\n'),
                _ => {}
            }
        }
        blocks.push(block);
    }

    Ok(strip_embed_marker(&blocks.join("\n")))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    kind: String,
    result: SongResult,
}

#[derive(Debug, Deserialize)]
struct SongResult {
    url: String,
    primary_artist: Option<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
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

    const SEARCH: &str = r#"{
        "response": {
            "hits": [
                {"type": "song", "result": {"url": "https://genius.com/other", "primary_artist": {"name": "Cover Band"}}},
                {"type": "song", "result": {"url": "https://genius.com/real", "primary_artist": {"name": "The Artist"}}}
            ]
        }
    }"#;

    const PAGE: &str = r#"<html><body>
        <div data-lyrics-container="true">[Verse 1]<br>First line<br><i>Second</i> line</div>
        <div class="ad">not lyrics</div>
        <div data-lyrics-container="true">Last line12Embed</div>
    </body></html>"#;

    #[test]
    fn test_extract_lyrics() {
        assert_eq!(
            extract_lyrics(PAGE).unwrap(),
            "[Verse 1]\nFirst line\nSecond line\nLast line"
        );
        assert_eq!(extract_lyrics("<html></html>").unwrap(), "");
    }

    #[core_async::test]
    async fn test_fetch_searches_then_scrapes_matching_artist() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.starts_with("https://api.genius.com/search?q="))
            .times(1)
            .returning(|req| {
                assert_eq!(
                    req.headers.get("Authorization").map(String::as_str),
                    Some("Bearer token")
                );
                Ok(response(200, SEARCH))
            });
        http.expect_execute()
            .withf(|req| req.url == "https://genius.com/real")
            .times(1)
            .returning(|_| Ok(response(200, PAGE)));

        let provider = GeniusProvider::new(Arc::new(http), "token".to_string());
        let lyrics = provider
            .fetch(&LyricsQuery::new("Song", "the artist"))
            .await
            .unwrap();

        assert_eq!(
            lyrics.as_deref(),
            Some("[Verse 1]\nFirst line\nSecond line\nLast line")
        );
    }

    #[core_async::test]
    async fn test_no_hits_is_none() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"response": {"hits": []}}"#)));

        let provider = GeniusProvider::new(Arc::new(http), "token".to_string());
        let lyrics = provider.fetch(&LyricsQuery::new("Song", "Artist")).await;

        assert!(matches!(lyrics, Ok(None)));
    }

    #[core_async::test]
    async fn test_api_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(401, r#"{"error": "invalid_token"}"#)));

        let provider = GeniusProvider::new(Arc::new(http), "bad".to_string());
        let result = provider.fetch(&LyricsQuery::new("Song", "Artist")).await;

        assert!(matches!(result, Err(MetadataError::LyricsFetchFailed(_))));
    }
}
