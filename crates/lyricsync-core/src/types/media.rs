//! Snapshot of the media session, sampled once per tick.

use serde::{Deserialize, Serialize};

use super::track::{TrackKey, TrackQuery};

/// What the player reports about the current track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSnapshot {
    pub title: String,
    pub artist: String,
    /// Raw playback position reported by the player.
    #[serde(alias = "position_ms")]
    pub raw_position_ms: i64,
    /// Track length, `0` when unknown.
    pub duration_ms: u64,
    pub is_playing: bool,
}

impl MediaSnapshot {
    /// A snapshot without a title carries no track.
    pub fn has_track(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.title)
    }

    pub fn query(&self) -> TrackQuery {
        TrackQuery::new(self.artist.clone(), self.title.clone()).with_duration(self.duration_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_json() {
        let snapshot: MediaSnapshot = serde_json::from_str(
            r#"{"title": "Song", "artist": "Artist", "position_ms": 1200, "is_playing": true}"#,
        )
        .unwrap();
        assert_eq!(snapshot.raw_position_ms, 1200);
        assert_eq!(snapshot.duration_ms, 0);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.query().duration_ms, None);
    }

    #[test]
    fn test_snapshot_without_title() {
        let snapshot = MediaSnapshot {
            title: "  ".into(),
            ..MediaSnapshot::default()
        };
        assert!(!snapshot.has_track());
    }
}
