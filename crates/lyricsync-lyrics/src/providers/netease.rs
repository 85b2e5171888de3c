//! NetEase Cloud Music (remote strategy B).

use std::time::Duration;

use lyricsync_core::{Error, LyricsSource, Result, TrackQuery};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::filter::ContentFilter;
use crate::http::HttpClient;
use crate::provider::{Lookup, LyricsProvider};

const DEFAULT_BASE_URL: &str = "https://music.163.com/api";
const SITE_REFERER: &str = "https://music.163.com";
const APP_COOKIE: &str = "appver=2.0.2";

/// Songs requested per search.
const SEARCH_LIMIT: u32 = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Vec<Song>,
}

#[derive(Debug, Clone, Deserialize)]
struct Song {
    id: u64,
    #[serde(default)]
    name: String,
    /// Milliseconds.
    #[serde(default)]
    duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LyricResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    lrc: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
struct LyricBody {
    #[serde(default)]
    lyric: Option<String>,
}

/// Check the `code` field NetEase puts in every response body.
fn check_code(code: i64, what: &str) -> Result<()> {
    if code == 200 {
        Ok(())
    } else {
        Err(Error::Api(format!("NetEase {what} returned code {code}")))
    }
}

fn parse_songs(response: SearchResponse) -> Result<Vec<Song>> {
    check_code(response.code, "search")?;
    Ok(response.result.unwrap_or_default().songs)
}

fn parse_lyric(response: LyricResponse) -> Result<Option<String>> {
    check_code(response.code, "lyric")?;
    Ok(response
        .lrc
        .and_then(|body| body.lyric)
        .filter(|text| !text.trim().is_empty()))
}

/// NetEase lyrics provider.
#[derive(Debug, Clone)]
pub struct NeteaseProvider {
    http: HttpClient,
    base_url: String,
}

impl NeteaseProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));
        headers.insert(COOKIE, HeaderValue::from_static(APP_COOKIE));

        Ok(Self {
            http: HttpClient::new(timeout, headers)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, query: &TrackQuery) -> Result<Vec<Song>> {
        let url = format!("{}/search/get", self.base_url);
        let params = [
            ("s", format!("{}-{}", query.title, query.artist)),
            ("type", "1".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        parse_songs(self.http.get_json(&url, &params).await?)
    }

    async fn lyric(&self, song_id: u64) -> Result<Option<String>> {
        let url = format!("{}/song/lyric", self.base_url);
        let params = [
            ("os", "pc".to_string()),
            ("id", song_id.to_string()),
            ("lv", "-1".to_string()),
            ("kv", "-1".to_string()),
            ("tv", "-1".to_string()),
        ];
        parse_lyric(self.http.get_json(&url, &params).await?)
    }

    async fn try_fetch(&self, query: &TrackQuery, filter: ContentFilter) -> Result<Lookup> {
        let mut songs = self.search(query).await?;
        super::prefer_duration(&mut songs, query.duration_secs(), |song| {
            song.duration.map(|ms| ms as f64 / 1000.0)
        });

        let mut filtered = false;
        for song in &songs {
            let Some(text) = self.lyric(song.id).await? else {
                continue;
            };

            match Lookup::from_lrc(&text, filter) {
                found @ Lookup::Found(_) => {
                    debug!("NetEase song {} ({}) accepted", song.id, song.name);
                    return Ok(found);
                }
                Lookup::Filtered => {
                    debug!("NetEase song {} rejected by content filter", song.id);
                    filtered = true;
                }
                _ => {}
            }
        }

        Ok(if filtered {
            Lookup::Filtered
        } else {
            Lookup::NotFound
        })
    }
}

impl LyricsProvider for NeteaseProvider {
    fn source(&self) -> LyricsSource {
        LyricsSource::Netease
    }

    async fn fetch(&self, query: &TrackQuery, filter: ContentFilter) -> Lookup {
        match self.try_fetch(query, filter).await {
            Ok(lookup) => lookup,
            Err(e) => {
                if e.is_network() {
                    debug!("NetEase unreachable: {e}");
                } else {
                    warn!("NetEase lookup failed: {e}");
                }
                Lookup::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::test_server::TestServer;
    use lyricsync_core::LyricLine;

    #[test]
    fn test_search_response() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"result": {"songs": [{"id": 1400256289, "name": "Song", "duration": 215000,
                "artists": [{"id": 1, "name": "Band"}]}], "songCount": 1}, "code": 200}"#,
        )
        .unwrap();
        let songs = parse_songs(response).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, 1_400_256_289);
        assert_eq!(songs[0].duration, Some(215_000));
    }

    #[test]
    fn test_search_without_result_is_empty() {
        let response: SearchResponse = serde_json::from_str(r#"{"code": 200}"#).unwrap();
        assert!(parse_songs(response).unwrap().is_empty());
    }

    #[test]
    fn test_error_code_is_an_error() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"code": -460, "message": "Cheating"}"#).unwrap();
        assert!(matches!(parse_songs(response), Err(Error::Api(_))));
    }

    #[test]
    fn test_lyric_response() {
        let response: LyricResponse = serde_json::from_str(
            r#"{"lrc": {"version": 3, "lyric": "[00:01.00]one\n[00:02.50]two\n"}, "code": 200}"#,
        )
        .unwrap();
        let text = parse_lyric(response).unwrap().unwrap();
        assert_eq!(
            Lookup::from_lrc(&text, ContentFilter::disabled()).line_count(),
            2
        );

        let response: LyricResponse =
            serde_json::from_str(r#"{"nolyric": true, "code": 200}"#).unwrap();
        assert_eq!(parse_lyric(response).unwrap(), None);
    }

    const SEARCH_TWO: &str = r#"{"code": 200, "result": {"songs": [
        {"id": 11, "name": "Song", "duration": 180000},
        {"id": 12, "name": "Song", "duration": 181000}]}}"#;
    const CJK_LYRIC: &str =
        r#"{"code": 200, "lrc": {"lyric": "[00:01.00]愛してる\n[00:02.00]夜空の星"}}"#;
    const LATIN_LYRIC: &str = r#"{"code": 200, "lrc": {"lyric": "[00:01.00]Hello\n[00:02.00]World"}}"#;

    fn provider_for(server: &TestServer) -> NeteaseProvider {
        NeteaseProvider::new(Duration::from_secs(2))
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_filtered_song_falls_through_to_next() {
        let server = TestServer::start(&[
            ("/search/get", SEARCH_TWO),
            ("/song/lyric?os=pc&id=11&", CJK_LYRIC),
            ("/song/lyric?os=pc&id=12&", LATIN_LYRIC),
        ])
        .await;
        let provider = provider_for(&server);

        let lookup = provider
            .fetch(&TrackQuery::new("Band", "Song"), ContentFilter::new(true))
            .await;
        assert_eq!(
            lookup,
            Lookup::Found(vec![
                LyricLine::new(1000, "Hello"),
                LyricLine::new(2000, "World"),
            ])
        );

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("/search/get?s=Song-Band"));
        assert!(requests[0].contains("limit=3"));
        assert!(requests[2].contains("id=12"));
    }

    #[tokio::test]
    async fn test_every_song_filtered() {
        let server = TestServer::start(&[
            ("/search/get", SEARCH_TWO),
            ("/song/lyric?os=pc&id=11&", CJK_LYRIC),
            ("/song/lyric?os=pc&id=12&", CJK_LYRIC),
        ])
        .await;
        let provider = provider_for(&server);

        let lookup = provider
            .fetch(&TrackQuery::new("Band", "Song"), ContentFilter::new(true))
            .await;
        assert_eq!(lookup, Lookup::Filtered);
    }

    #[tokio::test]
    async fn test_api_error_code_fails_the_lookup() {
        let server = TestServer::start(&[("/search/get", r#"{"code": -460}"#)]).await;
        let provider = provider_for(&server);

        let lookup = provider
            .fetch(&TrackQuery::new("Band", "Song"), ContentFilter::new(true))
            .await;
        assert!(matches!(lookup, Lookup::Failed(_)));
    }
}
