//! Timing helpers for lyricsync.
//!
//! - [`word_sync`]: synthesized per-word highlighting for line-synced lyrics
//! - [`position`]: smoothed playback position from coarse player samples

pub mod position;
pub mod word_sync;

pub use position::PositionEstimator;
pub use word_sync::{highlight, HighlightMarker, WordSyncPlan};
