//! # lyricsync-cache
//!
//! Local storage for lyricsync.
//!
//! This crate provides:
//! - A filesystem cache of lyrics resolved from remote sources
//! - An in-memory index over an offline LRCLIB dataset dump, persisted as a
//!   sidecar file next to the dataset

pub mod dataset;
pub mod store;

pub use dataset::{DatasetIndex, OfflineDataset, INDEX_VERSION};
pub use store::{CacheEntry, LyricsCache};
