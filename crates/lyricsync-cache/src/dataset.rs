//! Offline LRCLIB dataset support.
//!
//! The dataset is an LRCLIB SQLite dump with `tracks` and `lyrics` tables.
//! Scanning it per query is far too slow, so a one-time pass builds a map
//! from normalized `artist|title` to lyrics row id and stores it next to the
//! dataset as `<dataset>.index`. At startup only that map is loaded; lyric
//! text is read one row at a time, and only after an index hit.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use lyricsync_core::{Error, Result, TrackKey};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Version stamp written into index files.
pub const INDEX_VERSION: u32 = 1;

/// Rows between progress reports while building.
const PROGRESS_INTERVAL: u64 = 100_000;

const INDEX_QUERY: &str = "
    SELECT t.artist_name_lower, t.name_lower, l.id
    FROM lyrics l
    INNER JOIN tracks t ON l.track_id = t.id
    WHERE l.has_synced_lyrics = 1 AND l.instrumental = 0
    ORDER BY l.id
";

const LYRICS_QUERY: &str = "SELECT synced_lyrics, plain_lyrics FROM lyrics WHERE id = ?";

/// On-disk layout of the index file.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    created_at: DateTime<Utc>,
    total_entries: usize,
    entries: HashMap<String, i64>,
}

/// In-memory map from normalized `artist|title` to lyrics row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetIndex {
    entries: HashMap<String, i64>,
}

impl DatasetIndex {
    /// Sidecar index path for a dataset file.
    pub fn index_path(dataset_path: &Path) -> PathBuf {
        dataset_path.with_extension("index")
    }

    /// Build an index from `(artist, title, row_id)` rows. The first row
    /// seen for a key wins.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, S, i64)>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for (artist, title, id) in rows {
            index.insert_first(artist.as_ref(), title.as_ref(), id);
        }
        index
    }

    /// Build an index with a single streaming pass over an open dataset.
    /// Rows are visited by lyrics id, so the lowest id per key wins.
    pub fn build(conn: &Connection) -> Result<Self> {
        let started = Instant::now();
        let mut index = Self::default();

        let mut stmt = conn.prepare(INDEX_QUERY).map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;

        let mut scanned: u64 = 0;
        while let Some(row) = rows.next().map_err(db_err)? {
            let artist: String = row.get(0).map_err(db_err)?;
            let title: String = row.get(1).map_err(db_err)?;
            let id: i64 = row.get(2).map_err(db_err)?;
            index.insert_first(&artist, &title, id);

            scanned += 1;
            if scanned % PROGRESS_INTERVAL == 0 {
                info!(
                    "Index build: scanned {scanned} rows, {} unique tracks",
                    index.len()
                );
            }
        }

        info!(
            "Built dataset index with {} entries from {scanned} rows in {:.1}s",
            index.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(index)
    }

    /// Build an index from the dataset at `dataset_path` and write it to
    /// `index_path`.
    pub fn build_file(dataset_path: &Path, index_path: &Path) -> Result<Self> {
        info!("Building dataset index from {}", dataset_path.display());
        let conn = open_read_only(dataset_path)?;
        let index = Self::build(&conn)?;
        index.save(index_path)?;
        info!("Saved dataset index to {}", index_path.display());
        Ok(index)
    }

    /// Persist the index with a version and entry-count header.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = IndexFile {
            version: INDEX_VERSION,
            created_at: Utc::now(),
            total_entries: self.entries.len(),
            entries: self.entries.clone(),
        };

        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, &file)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a persisted index.
    pub fn load(path: &Path) -> Result<Self> {
        let started = Instant::now();
        let reader = BufReader::new(fs::File::open(path)?);
        let file: IndexFile = serde_json::from_reader(reader)?;

        if file.version != INDEX_VERSION {
            return Err(Error::Dataset(format!(
                "unsupported index version {} (expected {INDEX_VERSION})",
                file.version
            )));
        }
        if file.total_entries != file.entries.len() {
            return Err(Error::Dataset(format!(
                "index header claims {} entries but holds {}",
                file.total_entries,
                file.entries.len()
            )));
        }

        info!(
            "Loaded dataset index with {} entries in {}ms",
            file.entries.len(),
            started.elapsed().as_millis()
        );
        Ok(Self {
            entries: file.entries,
        })
    }

    /// Row id for a track, if the dataset has synced lyrics for it.
    pub fn lookup(&self, artist: &str, title: &str) -> Option<i64> {
        self.entries
            .get(&TrackKey::new(artist, title).joined())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert_first(&mut self, artist: &str, title: &str, id: i64) {
        self.entries
            .entry(TrackKey::new(artist, title).joined())
            .or_insert(id);
    }
}

/// The offline dataset: the loaded index plus a read-only connection used
/// for single-row lyric fetches.
pub struct OfflineDataset {
    path: PathBuf,
    index: DatasetIndex,
    conn: Mutex<Connection>,
}

impl OfflineDataset {
    /// Open a dataset, building its index first if none exists.
    ///
    /// Building scans the whole dataset and can take minutes; it only
    /// happens once.
    pub fn open(dataset_path: &Path) -> Result<Self> {
        if !dataset_path.is_file() {
            return Err(Error::Dataset(format!(
                "dataset not found at {}",
                dataset_path.display()
            )));
        }

        let index_path = DatasetIndex::index_path(dataset_path);
        let index = if index_path.exists() {
            DatasetIndex::load(&index_path)?
        } else {
            info!("No dataset index found, building one (this only happens once)");
            DatasetIndex::build_file(dataset_path, &index_path)?
        };

        let conn = open_read_only(dataset_path)?;
        conn.pragma_update(None, "temp_store", "MEMORY")
            .and_then(|()| conn.pragma_update(None, "mmap_size", 268_435_456))
            .and_then(|()| conn.pragma_update(None, "cache_size", -64_000))
            .map_err(db_err)?;

        info!("Offline dataset ready at {}", dataset_path.display());
        Ok(Self::with_index(dataset_path.to_path_buf(), conn, index))
    }

    /// Assemble a dataset from an already open connection and index.
    pub fn with_index(path: PathBuf, conn: Connection, index: DatasetIndex) -> Self {
        Self {
            path,
            index,
            conn: Mutex::new(conn),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn index(&self) -> &DatasetIndex {
        &self.index
    }

    /// Row id for a track; never touches the dataset file.
    pub fn lookup(&self, artist: &str, title: &str) -> Option<i64> {
        self.index.lookup(artist, title)
    }

    /// Fetch the lyric text of one row, preferring synced over plain.
    pub fn fetch_lyrics(&self, row_id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let row: Option<(Option<String>, Option<String>)> = conn
            .query_row(LYRICS_QUERY, [row_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
            .map_err(db_err)?;

        let Some((synced, plain)) = row else {
            debug!("Dataset row {row_id} not found");
            return Ok(None);
        };

        Ok([synced, plain]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty()))
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| Error::Database(format!("Failed to open {}: {e}", path.display())))
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}
