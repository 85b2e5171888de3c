//! Core domain types for lyricsync.

pub mod lyrics;
pub mod media;
pub mod track;

pub use lyrics::{is_ordered, sort_lines, LyricLine, LyricsDocument, LyricsSource};
pub use media::MediaSnapshot;
pub use track::{normalize_text, TrackKey, TrackQuery};
