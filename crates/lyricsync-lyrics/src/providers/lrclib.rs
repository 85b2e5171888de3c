//! LRCLIB web API (remote strategy A).
//!
//! API documentation: <https://lrclib.net/docs>

use std::time::Duration;

use lyricsync_core::{LyricsSource, Result, TrackQuery};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::filter::ContentFilter;
use crate::http::HttpClient;
use crate::provider::{Lookup, LyricsProvider};

const DEFAULT_BASE_URL: &str = "https://lrclib.net/api";

/// One entry of a `/search` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    id: i64,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
}

/// A `/get/{id}` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LyricsRecord {
    #[serde(default)]
    synced_lyrics: Option<String>,
    #[serde(default)]
    plain_lyrics: Option<String>,
}

impl LyricsRecord {
    /// Synced lyrics when present, otherwise plain lyrics.
    fn best_text(&self) -> Option<&str> {
        [&self.synced_lyrics, &self.plain_lyrics]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.trim().is_empty())
    }
}

/// LRCLIB lyrics provider.
#[derive(Debug, Clone)]
pub struct LrclibProvider {
    http: HttpClient,
    base_url: String,
}

impl LrclibProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(timeout, HeaderMap::new())?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at another LRCLIB instance.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, query: &TrackQuery) -> Result<Vec<SearchResult>> {
        let mut params = vec![
            ("track_name", query.title.clone()),
            ("artist_name", query.artist.clone()),
        ];
        if let Some(secs) = query.duration_secs() {
            params.push(("duration", secs.to_string()));
        }

        let url = format!("{}/search", self.base_url);
        self.http.get_json(&url, &params).await
    }

    async fn get(&self, id: i64) -> Result<LyricsRecord> {
        let url = format!("{}/get/{id}", self.base_url);
        self.http.get_json(&url, &[]).await
    }

    async fn try_fetch(&self, query: &TrackQuery, filter: ContentFilter) -> Result<Lookup> {
        let mut results = self.search(query).await?;
        super::prefer_duration(&mut results, query.duration_secs(), |r| r.duration);
        debug!("LRCLIB returned {} candidates", results.len());

        let mut filtered = false;
        for candidate in results.iter().filter(|r| !r.instrumental) {
            let record = match self.get(candidate.id).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() => {
                    debug!("LRCLIB candidate {} has no record", candidate.id);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(text) = record.best_text() else {
                continue;
            };

            match Lookup::from_lrc(text, filter) {
                found @ Lookup::Found(_) => {
                    debug!(
                        "LRCLIB candidate {} ({} - {}) accepted",
                        candidate.id,
                        candidate.artist_name.as_deref().unwrap_or("?"),
                        candidate.track_name.as_deref().unwrap_or("?")
                    );
                    return Ok(found);
                }
                Lookup::Filtered => {
                    debug!("LRCLIB candidate {} rejected by content filter", candidate.id);
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

impl LyricsProvider for LrclibProvider {
    fn source(&self) -> LyricsSource {
        LyricsSource::Lrclib
    }

    async fn fetch(&self, query: &TrackQuery, filter: ContentFilter) -> Lookup {
        match self.try_fetch(query, filter).await {
            Ok(lookup) => lookup,
            Err(e) => {
                if e.is_network() {
                    debug!("LRCLIB unreachable: {e}");
                } else {
                    warn!("LRCLIB lookup failed: {e}");
                }
                Lookup::Failed(e.to_string())
            }
        }
    }
}
