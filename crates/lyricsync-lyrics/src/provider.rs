//! The contract every lyrics source implements.

use std::future::Future;

use lyricsync_core::{is_ordered, LyricLine, LyricsSource, TrackQuery};

use crate::filter::ContentFilter;
use crate::lrc;

/// Result of asking one source for lyrics.
///
/// Providers never return errors: failures are reported as
/// [`Lookup::Failed`] and the chain moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Non-empty, time-sorted lines.
    Found(Vec<LyricLine>),
    /// A candidate existed but the content filter rejected it.
    Filtered,
    /// Nothing usable was found.
    NotFound,
    /// The source could not be queried.
    Failed(String),
}

impl Lookup {
    pub fn line_count(&self) -> usize {
        match self {
            Self::Found(lines) => lines.len(),
            _ => 0,
        }
    }

    /// Turn raw LRC text into a lookup result.
    ///
    /// Text that parses to nothing is a miss; text the filter rejects is
    /// [`Lookup::Filtered`].
    pub fn from_lrc(raw: &str, filter: ContentFilter) -> Self {
        Self::from_lines(lrc::parse(raw), filter)
    }

    /// Validate already-parsed lines.
    ///
    /// Out-of-order timestamps are treated as a miss.
    pub fn from_lines(lines: Vec<LyricLine>, filter: ContentFilter) -> Self {
        if lines.is_empty() || !is_ordered(&lines) {
            Self::NotFound
        } else if filter.rejects(&lines) {
            Self::Filtered
        } else {
            Self::Found(lines)
        }
    }
}

/// A remote lyrics source.
pub trait LyricsProvider: Send + Sync {
    /// Which chain step this provider fills.
    fn source(&self) -> LyricsSource;

    /// Look up lyrics for `query`, applying `filter` to every candidate.
    fn fetch(
        &self,
        query: &TrackQuery,
        filter: ContentFilter,
    ) -> impl Future<Output = Lookup> + Send;
}
