//! Time-tagged lyric lines and the documents built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A single line of lyrics with its start timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LyricLine {
    /// Start time in milliseconds from the beginning of the track.
    pub time_ms: u64,
    /// Line text, already stripped of time tags.
    pub text: String,
}

impl LyricLine {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
        }
    }
}

/// Sort lines by timestamp, keeping first-seen order for equal timestamps.
pub fn sort_lines(lines: &mut [LyricLine]) {
    lines.sort_by_key(|line| line.time_ms);
}

/// Whether timestamps never decrease.
pub fn is_ordered(lines: &[LyricLine]) -> bool {
    lines.windows(2).all(|pair| pair[0].time_ms <= pair[1].time_ms)
}

/// Where a lyrics document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsSource {
    /// Local filesystem cache.
    Cache,
    /// Offline LRCLIB dataset dump.
    OfflineDataset,
    /// LRCLIB web API (remote strategy A).
    #[serde(alias = "remote_a")]
    Lrclib,
    /// NetEase Cloud Music API (remote strategy B).
    #[serde(alias = "remote_b")]
    Netease,
    /// Nothing was found.
    #[default]
    None,
}

impl LyricsSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::OfflineDataset => "offline_dataset",
            Self::Lrclib => "lrclib",
            Self::Netease => "netease",
            Self::None => "none",
        }
    }
}

impl fmt::Display for LyricsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LyricsSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cache" => Ok(Self::Cache),
            "offline_dataset" | "dataset" | "localdb" => Ok(Self::OfflineDataset),
            "lrclib" | "remote_a" => Ok(Self::Lrclib),
            "netease" | "remote_b" => Ok(Self::Netease),
            "none" => Ok(Self::None),
            other => Err(Error::Config(format!("unknown lyrics source: {other}"))),
        }
    }
}

/// The resolved lyrics for one track.
///
/// Lines are always sorted by timestamp. A document is never edited after
/// construction; a track change produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsDocument {
    lines: Vec<LyricLine>,
    source: LyricsSource,
}

impl LyricsDocument {
    pub fn new(mut lines: Vec<LyricLine>, source: LyricsSource) -> Self {
        sort_lines(&mut lines);
        Self { lines, source }
    }

    /// A document with no lines, tagged [`LyricsSource::None`].
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            source: LyricsSource::None,
        }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub const fn source(&self) -> LyricsSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Index of the last line starting at or before `position_ms`.
    pub fn line_index_at(&self, position_ms: i64) -> Option<usize> {
        if position_ms < 0 {
            return None;
        }
        let position = position_ms as u64;
        self.lines
            .partition_point(|line| line.time_ms <= position)
            .checked_sub(1)
    }

    /// The line after `index`, if any.
    pub fn following(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index + 1)
    }

    /// Timestamp of the last line, used as a track length fallback.
    pub fn last_timestamp_ms(&self) -> u64 {
        self.lines.last().map_or(0, |line| line.time_ms)
    }
}
