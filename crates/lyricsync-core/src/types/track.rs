//! Track identity used for cache keys, index keys and change detection.

use serde::{Deserialize, Serialize};

/// Lowercase `s` and collapse every whitespace run to a single space.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized (artist, title) pair.
///
/// Two tracks are the same when their names differ only in case or
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackKey {
    artist: String,
    title: String,
}

impl TrackKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: normalize_text(artist),
            title: normalize_text(title),
        }
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The `artist|title` form used by the offline dataset index.
    pub fn joined(&self) -> String {
        format!("{}|{}", self.artist, self.title)
    }
}

/// A lyrics lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackQuery {
    /// Track title as reported by the player.
    pub title: String,
    /// Artist name as reported by the player.
    pub artist: String,
    /// Track duration, when the player knows it.
    pub duration_ms: Option<u64>,
}

impl TrackQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = (duration_ms > 0).then_some(duration_ms);
        self
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.title)
    }

    /// Duration rounded to whole seconds.
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration_ms.map(|ms| (ms + 500) / 1000)
    }
}
