//! Lyrics retrieval for lyricsync.
//!
//! Lyrics are looked up through a fixed chain: the local cache, the offline
//! LRCLIB dataset, the LRCLIB web API and finally NetEase. See [`Resolver`].

pub mod filter;
pub mod http;
pub mod lrc;
pub mod provider;
pub mod providers;
pub mod resolver;

pub use filter::ContentFilter;
pub use provider::{Lookup, LyricsProvider};
pub use providers::{LrclibProvider, NeteaseProvider};
pub use resolver::{Attempt, Outcome, Resolution, Resolver};
