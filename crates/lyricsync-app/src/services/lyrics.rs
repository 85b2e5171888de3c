//! The polling loop that turns media snapshots into display updates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use lyricsync_core::{LyricsDocument, LyricsSource, MediaSnapshot, TrackKey, TrackQuery};
use lyricsync_lyrics::{LrclibProvider, LyricsProvider, NeteaseProvider, Resolver};
use lyricsync_timing::{highlight, HighlightMarker, PositionEstimator};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::media::{Control, MediaSource};
use super::relay::Relay;
use crate::config::Config;

/// How lyrics are shown.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub word_sync: bool,
    /// Documents from these sources are never shown.
    pub disabled_sources: HashSet<LyricsSource>,
    pub heartbeat: Duration,
    pub line_hold: Option<Duration>,
    pub marker: HighlightMarker,
}

impl DisplaySettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            word_sync: config.word_sync,
            disabled_sources: config.disabled_sources()?,
            heartbeat: config.heartbeat(),
            line_hold: config.line_hold(),
            marker: config.highlight.clone(),
        })
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            word_sync: false,
            disabled_sources: HashSet::new(),
            heartbeat: Duration::from_secs(4),
            line_hold: Some(Duration::from_secs(5)),
            marker: HighlightMarker::default(),
        }
    }
}

type Resolved = (TrackKey, LyricsDocument);

/// Tracks the current song, resolves its lyrics in the background and
/// produces `"<text> <progress>"` updates.
pub struct LyricsService<A = LrclibProvider, B = NeteaseProvider> {
    resolver: Arc<Resolver<A, B>>,
    estimator: PositionEstimator,
    settings: DisplaySettings,
    track: Option<TrackKey>,
    document: LyricsDocument,
    in_flight: HashSet<TrackKey>,
    resolved_tx: mpsc::UnboundedSender<Resolved>,
    resolved_rx: mpsc::UnboundedReceiver<Resolved>,
    /// Line index shown in line mode and when it first appeared.
    shown_line: Option<(usize, Instant)>,
    last_text: Option<String>,
    last_emit: Option<Instant>,
}

impl<A, B> LyricsService<A, B>
where
    A: LyricsProvider + 'static,
    B: LyricsProvider + 'static,
{
    pub fn new(resolver: Arc<Resolver<A, B>>, settings: DisplaySettings, offset_ms: i64) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        Self {
            resolver,
            estimator: PositionEstimator::new(offset_ms),
            settings,
            track: None,
            document: LyricsDocument::empty(),
            in_flight: HashSet::new(),
            resolved_tx,
            resolved_rx,
            shown_line: None,
            last_text: None,
            last_emit: None,
        }
    }

    pub const fn word_sync(&self) -> bool {
        self.settings.word_sync
    }

    pub const fn document(&self) -> &LyricsDocument {
        &self.document
    }

    pub const fn track(&self) -> Option<&TrackKey> {
        self.track.as_ref()
    }

    /// Poll `source` every `tick_interval` and relay updates until the source
    /// closes.
    pub async fn run<S, R>(
        mut self,
        mut source: S,
        mut relay: R,
        tick_interval: Duration,
    ) -> Result<()>
    where
        S: MediaSource,
        R: Relay,
    {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            while let Some(control) = source.next_control() {
                self.apply_control(control);
            }

            if let Some(snapshot) = source.snapshot() {
                if let Some(message) = self.tick(&snapshot, Instant::now()) {
                    relay.send(&message).context("Failed to relay update")?;
                }
            }

            if source.is_closed() {
                info!("Media source closed, stopping");
                return Ok(());
            }
        }
    }

    /// Switch display mode.
    pub fn apply_control(&mut self, control: Control) {
        let word_sync = match control {
            Control::WordSync(enabled) => enabled,
            Control::ToggleWordSync => !self.word_sync(),
        };
        if word_sync == self.word_sync() {
            return;
        }

        info!(
            "Display mode: {}",
            if word_sync { "word sync" } else { "line" }
        );
        self.settings.word_sync = word_sync;
        self.shown_line = None;
    }

    /// Process one snapshot taken at `now`.
    ///
    /// Returns the update to relay, if one is due: the display text changed
    /// or the heartbeat interval has passed since the last update.
    pub fn tick(&mut self, snapshot: &MediaSnapshot, now: Instant) -> Option<String> {
        self.drain_resolved();

        if !snapshot.has_track() {
            return None;
        }

        let key = snapshot.key();
        let track_changed = self.track() != Some(&key);
        let position = self.estimator.observe(
            snapshot.raw_position_ms,
            snapshot.is_playing,
            track_changed,
            now,
        );
        if track_changed {
            self.change_track(key, snapshot.query());
        }

        let text = self.display_text(position, now);
        let progress = self.progress(position, snapshot.duration_ms);

        let changed = self.last_text.as_deref() != Some(text.as_str());
        let heartbeat_due = self
            .last_emit
            .map_or(true, |at| now.saturating_duration_since(at) >= self.settings.heartbeat);
        if !changed && !heartbeat_due {
            return None;
        }

        let message = format!("{text} {progress:.3}");
        self.last_text = Some(text);
        self.last_emit = Some(now);
        Some(message)
    }

    /// Wait for the next background resolution and apply it.
    #[cfg(test)]
    async fn wait_resolved(&mut self) {
        if let Some(resolved) = self.resolved_rx.recv().await {
            self.apply_resolved(resolved);
        }
    }

    fn drain_resolved(&mut self) {
        while let Ok(resolved) = self.resolved_rx.try_recv() {
            self.apply_resolved(resolved);
        }
    }

    fn apply_resolved(&mut self, (key, document): Resolved) {
        self.in_flight.remove(&key);

        if self.track() == Some(&key) {
            self.document = document;
            self.shown_line = None;
            debug!(
                "{} lyric lines from {}",
                self.document().len(),
                self.document().source()
            );
        } else {
            debug!(
                "Discarding lyrics for {} - {}: track changed",
                key.artist(),
                key.title()
            );
        }
    }

    fn change_track(&mut self, key: TrackKey, query: TrackQuery) {
        info!("Now playing: {} - {}", query.artist, query.title);
        self.track = Some(key.clone());
        self.document = LyricsDocument::empty();
        self.shown_line = None;

        if !self.in_flight.insert(key.clone()) {
            debug!("Lyrics for {} - {} already being resolved", query.artist, query.title);
            return;
        }

        let resolver = Arc::clone(&self.resolver);
        let resolved_tx = self.resolved_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move { resolver.resolve(&query).await.document });
            let document = match task.await {
                Ok(document) => document,
                Err(e) => {
                    warn!(
                        "Lyrics resolution for {} - {} failed: {e}",
                        key.artist(),
                        key.title()
                    );
                    LyricsDocument::empty()
                }
            };
            let _ = resolved_tx.send((key, document));
        });
    }

    fn display_text(&mut self, position_ms: u64, now: Instant) -> String {
        if self
            .settings
            .disabled_sources
            .contains(&self.document.source())
        {
            return String::new();
        }

        let Some(index) = self.document.line_index_at(position_ms as i64) else {
            self.shown_line = None;
            return String::new();
        };
        let line = &self.document.lines()[index];

        if self.settings.word_sync {
            let elapsed_ms = position_ms.saturating_sub(line.time_ms) as i64;
            return highlight(
                line,
                self.document.following(index),
                elapsed_ms,
                &self.settings.marker,
            );
        }

        let since = match self.shown_line {
            Some((shown, since)) if shown == index => since,
            _ => {
                self.shown_line = Some((index, now));
                now
            }
        };
        if self
            .settings
            .line_hold
            .is_some_and(|hold| now.saturating_duration_since(since) >= hold)
        {
            return String::new();
        }

        line.text.clone()
    }

    /// Playback progress in `[0, 1]`, falling back to the last lyric
    /// timestamp when the player reports no duration.
    fn progress(&self, position_ms: u64, duration_ms: u64) -> f64 {
        let duration_ms = if duration_ms > 0 {
            duration_ms
        } else {
            self.document.last_timestamp_ms()
        };

        if duration_ms == 0 {
            0.0
        } else {
            (position_ms as f64 / duration_ms as f64).min(1.0)
        }
    }
}
