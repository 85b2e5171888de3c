//! The lyrics retrieval chain.
//!
//! Steps run in a fixed order and the first usable result wins:
//!
//! 1. local cache
//! 2. offline dataset (index hit plus a single row fetch)
//! 3. LRCLIB
//! 4. NetEase
//!
//! Results from the remote steps are written back to the cache. Cache and
//! dataset I/O runs on the blocking pool. Every step
//! reports an [`Attempt`] so callers can see why a track resolved the way it
//! did.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lyricsync_cache::{LyricsCache, OfflineDataset};
use lyricsync_core::{LyricsDocument, LyricsSource, TrackQuery};
use tracing::{debug, info, warn};

use crate::filter::ContentFilter;
use crate::provider::{Lookup, LyricsProvider};
use crate::providers::{LrclibProvider, NeteaseProvider};

/// How one chain step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    Filtered,
    Failed(String),
    /// The step is disabled.
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("hit"),
            Self::Miss => f.write_str("miss"),
            Self::Filtered => f.write_str("filtered"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Record of one chain step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub source: LyricsSource,
    pub outcome: Outcome,
    pub elapsed: Duration,
    pub line_count: usize,
}

/// The resolved document plus the steps taken to get it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub document: LyricsDocument,
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    /// Attempt recorded for `source`, if that step ran.
    pub fn attempt(&self, source: LyricsSource) -> Option<&Attempt> {
        self.attempts.iter().find(|attempt| attempt.source == source)
    }
}

/// Runs the retrieval chain for one track at a time.
pub struct Resolver<A = LrclibProvider, B = NeteaseProvider> {
    cache: LyricsCache,
    dataset: Option<Arc<OfflineDataset>>,
    primary: A,
    secondary: B,
    filter: ContentFilter,
    offline_mode: bool,
}

impl<A: LyricsProvider, B: LyricsProvider> Resolver<A, B> {
    pub fn new(cache: LyricsCache, primary: A, secondary: B) -> Self {
        Self {
            cache,
            dataset: None,
            primary,
            secondary,
            filter: ContentFilter::default(),
            offline_mode: false,
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset: Option<Arc<OfflineDataset>>) -> Self {
        self.dataset = dataset;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Skip both remote steps.
    #[must_use]
    pub fn with_offline_mode(mut self, offline_mode: bool) -> Self {
        self.offline_mode = offline_mode;
        self
    }

    pub const fn cache(&self) -> &LyricsCache {
        &self.cache
    }

    /// Resolve lyrics for `query`.
    ///
    /// Never fails: when no step produces lines the result is
    /// [`LyricsDocument::empty`].
    pub async fn resolve(&self, query: &TrackQuery) -> Resolution {
        let mut attempts = Vec::with_capacity(4);

        let started = Instant::now();
        let cached = self.cache_lookup(query).await;
        attempts.push(Attempt {
            source: LyricsSource::Cache,
            outcome: if cached.is_some() {
                Outcome::Hit
            } else {
                Outcome::Miss
            },
            elapsed: started.elapsed(),
            line_count: cached.as_ref().map_or(0, LyricsDocument::len),
        });
        if let Some(document) = cached {
            return self.finish(query, document, attempts);
        }

        let started = Instant::now();
        let lookup = self.from_dataset(query).await;
        if let Some(document) =
            record(&mut attempts, LyricsSource::OfflineDataset, lookup, started)
        {
            return self.finish(query, document, attempts);
        }

        if let Some(document) = self.from_provider(&self.primary, query, &mut attempts).await {
            return self.finish(query, document, attempts);
        }
        if let Some(document) = self.from_provider(&self.secondary, query, &mut attempts).await {
            return self.finish(query, document, attempts);
        }

        self.finish(query, LyricsDocument::empty(), attempts)
    }

    /// Run a remote step, caching what it finds.
    async fn from_provider<P: LyricsProvider>(
        &self,
        provider: &P,
        query: &TrackQuery,
        attempts: &mut Vec<Attempt>,
    ) -> Option<LyricsDocument> {
        let source = provider.source();
        if self.offline_mode {
            attempts.push(skipped(source));
            return None;
        }

        let started = Instant::now();
        let lookup = provider.fetch(query, self.filter).await;
        let document = record(attempts, source, Some(lookup), started)?;

        self.cache_save(query, &document, source).await;
        Some(document)
    }

    async fn cache_lookup(&self, query: &TrackQuery) -> Option<LyricsDocument> {
        let cache = self.cache.clone();
        let (artist, title) = (query.artist.clone(), query.title.clone());
        tokio::task::spawn_blocking(move || cache.lookup(&artist, &title))
            .await
            .unwrap_or_else(|e| {
                warn!("Cache lookup task failed: {e}");
                None
            })
    }

    async fn cache_save(
        &self,
        query: &TrackQuery,
        document: &LyricsDocument,
        source: LyricsSource,
    ) {
        let cache = self.cache.clone();
        let (artist, title) = (query.artist.clone(), query.title.clone());
        let lines = document.lines().to_vec();
        let saved =
            tokio::task::spawn_blocking(move || cache.save(&artist, &title, &lines, source)).await;
        if let Err(e) = saved {
            warn!("Cache save task failed: {e}");
        }
    }

    /// Index lookup plus row fetch. `None` when no dataset is configured.
    async fn from_dataset(&self, query: &TrackQuery) -> Option<Lookup> {
        let dataset = self.dataset.as_ref()?;
        let Some(row_id) = dataset.lookup(&query.artist, &query.title) else {
            return Some(Lookup::NotFound);
        };

        let dataset = Arc::clone(dataset);
        let fetched = tokio::task::spawn_blocking(move || dataset.fetch_lyrics(row_id)).await;

        Some(match fetched {
            Ok(Ok(Some(text))) => Lookup::from_lrc(&text, self.filter),
            Ok(Ok(None)) => Lookup::NotFound,
            Ok(Err(e)) => Lookup::Failed(e.to_string()),
            Err(e) => Lookup::Failed(format!("dataset task failed: {e}")),
        })
    }

    fn finish(
        &self,
        query: &TrackQuery,
        document: LyricsDocument,
        attempts: Vec<Attempt>,
    ) -> Resolution {
        for attempt in &attempts {
            debug!(
                source = %attempt.source,
                outcome = %attempt.outcome,
                elapsed_ms = attempt.elapsed.as_millis() as u64,
                lines = attempt.line_count,
                "Lyrics step"
            );
        }

        if document.is_empty() {
            info!("No lyrics found for {} - {}", query.artist, query.title);
        } else {
            info!(
                "Resolved {} lines for {} - {} from {}",
                document.len(),
                query.artist,
                query.title,
                document.source()
            );
        }

        Resolution { document, attempts }
    }
}

/// Record the attempt for a finished step and return a document on a hit.
///
/// A `None` lookup means the step is not configured.
fn record(
    attempts: &mut Vec<Attempt>,
    source: LyricsSource,
    lookup: Option<Lookup>,
    started: Instant,
) -> Option<LyricsDocument> {
    let Some(lookup) = lookup else {
        attempts.push(skipped(source));
        return None;
    };

    let line_count = lookup.line_count();
    let (outcome, document) = match lookup {
        Lookup::Found(lines) => (Outcome::Hit, Some(LyricsDocument::new(lines, source))),
        Lookup::Filtered => (Outcome::Filtered, None),
        Lookup::NotFound => (Outcome::Miss, None),
        Lookup::Failed(reason) => (Outcome::Failed(reason), None),
    };
    attempts.push(Attempt {
        source,
        outcome,
        elapsed: started.elapsed(),
        line_count,
    });
    document
}

const fn skipped(source: LyricsSource) -> Attempt {
    Attempt {
        source,
        outcome: Outcome::Skipped,
        elapsed: Duration::ZERO,
        line_count: 0,
    }
}
