//! Filesystem cache of resolved lyrics.
//!
//! Each track gets one pretty-printed JSON file named
//! `<artist>-<title>-<sha256>.json`. The readable part is only for people
//! browsing the directory; the hash of the normalized track key is what makes
//! the name stable across case and whitespace differences.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use lyricsync_core::{
    sort_lines, Error, LyricLine, LyricsDocument, LyricsSource, Result, TrackKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Longest readable name component kept in a file name, in characters.
const MAX_SLUG_CHARS: usize = 48;

/// Distinguishes temp files written concurrently by this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One persisted cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub artist: String,
    pub title: String,
    pub source: LyricsSource,
    pub saved_at: DateTime<Utc>,
    pub lines: Vec<LyricLine>,
}

/// Filesystem-backed lyrics cache.
///
/// Entries never expire and are never removed by this type; an operator
/// clears the directory by hand.
#[derive(Debug, Clone)]
pub struct LyricsCache {
    cache_dir: PathBuf,
}

impl LyricsCache {
    /// Create a cache in the platform cache directory.
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "lyricsync", "lyricsync")
            .ok_or_else(|| Error::Cache("Failed to determine cache directory".to_string()))?;

        Ok(Self::with_path(project_dirs.cache_dir().join("lyrics")))
    }

    /// Create a cache rooted at `cache_dir`.
    ///
    /// The directory is created on the first save.
    pub fn with_path(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Stable hex fingerprint of a track key.
    pub fn fingerprint(key: &TrackKey) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.joined().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Path of the cache file for a track.
    pub fn entry_path(&self, artist: &str, title: &str) -> PathBuf {
        let key = TrackKey::new(artist, title);
        let name = format!(
            "{}-{}-{}.json",
            slug(key.artist()),
            slug(key.title()),
            Self::fingerprint(&key)
        );
        self.cache_dir.join(name)
    }

    /// Look up cached lyrics.
    ///
    /// Read or decode failures and entries without lines are misses.
    pub fn lookup(&self, artist: &str, title: &str) -> Option<LyricsDocument> {
        match self.load_entry(artist, title) {
            Ok(Some(entry)) if entry.lines.is_empty() => {
                debug!("Ignoring empty cache entry for {artist} - {title}");
                None
            }
            Ok(Some(entry)) => Some(LyricsDocument::new(entry.lines, LyricsSource::Cache)),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read cache entry for {artist} - {title}: {e}");
                None
            }
        }
    }

    /// Read the raw cache entry for a track, with lines sorted.
    pub fn load_entry(&self, artist: &str, title: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(artist, title);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut entry: CacheEntry = serde_json::from_str(&json)?;
        sort_lines(&mut entry.lines);
        Ok(Some(entry))
    }

    /// Store lyrics for a track, replacing any previous entry.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn save(&self, artist: &str, title: &str, lines: &[LyricLine], source: LyricsSource) {
        match self.try_save(artist, title, lines, source) {
            Ok(path) => info!("Cached {} lines at {}", lines.len(), path.display()),
            Err(e) => warn!("Failed to cache lyrics for {artist} - {title}: {e}"),
        }
    }

    /// Store lyrics for a track and return the written path.
    pub fn try_save(
        &self,
        artist: &str,
        title: &str,
        lines: &[LyricLine],
        source: LyricsSource,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| Error::Cache(format!("Failed to create cache directory: {e}")))?;

        let mut lines = lines.to_vec();
        sort_lines(&mut lines);

        let entry = CacheEntry {
            artist: artist.to_string(),
            title: title.to_string(),
            source,
            saved_at: Utc::now(),
            lines,
        };
        let json = serde_json::to_vec_pretty(&entry)?;

        let path = self.entry_path(artist, title);
        write_atomic(&path, &json)?;
        Ok(path)
    }
}

/// Write through a sibling temp file and rename, so readers never see a
/// partially written entry.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{}.{counter}.tmp", std::process::id()));

    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// File-name-safe, length-limited version of `s`.
fn slug(s: &str) -> String {
    let slug: String = s
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '.' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .take(MAX_SLUG_CHARS)
        .collect();

    if slug.is_empty() {
        "_".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines() -> Vec<LyricLine> {
        vec![
            LyricLine::new(3000, "second"),
            LyricLine::new(1000, "first"),
        ]
    }

    #[test]
    fn test_fingerprint_ignores_case_and_spacing() {
        let a = LyricsCache::fingerprint(&TrackKey::new("Daft Punk", "Digital Love"));
        let b = LyricsCache::fingerprint(&TrackKey::new(" daft punk", "DIGITAL   love"));
        let c = LyricsCache::fingerprint(&TrackKey::new("Daft Punk", "Voyager"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64); // SHA256 hex
    }

    #[test]
    fn test_entry_path_is_readable() {
        let cache = LyricsCache::with_path("/tmp/lyrics");
        let path = cache.entry_path("AC/DC", "Back In Black");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("ac_dc-back_in_black-"));
        assert!(name.ends_with(".json"));
        assert_eq!(path, cache.entry_path("ac/dc", "back in  black"));
    }

    #[test]
    fn test_slug_is_truncated() {
        let long = "x".repeat(200);
        assert_eq!(slug(&long).chars().count(), MAX_SLUG_CHARS);
        assert_eq!(slug(""), "_");
    }

    #[test]
    fn test_save_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::with_path(dir.path().join("nested"));

        assert!(cache.lookup("Artist", "Song").is_none());
        cache.save("Artist", "Song", &lines(), LyricsSource::Lrclib);

        let doc = cache.lookup("artist", "SONG").unwrap();
        assert_eq!(doc.source(), LyricsSource::Cache);
        assert_eq!(doc.lines()[0].text, "first");
        assert_eq!(doc.lines()[1].text, "second");

        let entry = cache.load_entry("Artist", "Song").unwrap().unwrap();
        assert_eq!(entry.source, LyricsSource::Lrclib);
        assert_eq!(entry.artist, "Artist");
    }

    #[test]
    fn test_saved_file_is_sorted_json() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::with_path(dir.path());
        let path = cache
            .try_save("Artist", "Song", &lines(), LyricsSource::Netease)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["source"], "netease");
        assert_eq!(value["lines"][0]["time_ms"], 1000);
        assert_eq!(value["lines"][1]["text"], "second");
    }

    #[test]
    fn test_empty_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::with_path(dir.path());
        cache.save("Artist", "Song", &[], LyricsSource::Lrclib);

        assert!(cache.load_entry("Artist", "Song").unwrap().is_some());
        assert!(cache.lookup("Artist", "Song").is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::with_path(dir.path());
        fs::write(cache.entry_path("Artist", "Song"), "{ not json").unwrap();

        assert!(cache.load_entry("Artist", "Song").is_err());
        assert!(cache.lookup("Artist", "Song").is_none());
    }

    #[test]
    fn test_unwritable_cache_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let cache = LyricsCache::with_path(blocker.join("cache"));
        cache.save("Artist", "Song", &lines(), LyricsSource::Lrclib);
        assert!(cache.lookup("Artist", "Song").is_none());
    }

    #[test]
    fn test_refetch_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::with_path(dir.path());
        cache.save("Artist", "Song", &lines(), LyricsSource::Lrclib);
        cache.save(
            "Artist",
            "Song",
            &[LyricLine::new(0, "replaced")],
            LyricsSource::Netease,
        );

        let doc = cache.lookup("Artist", "Song").unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.lines()[0].text, "replaced");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
