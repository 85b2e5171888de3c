//! Playback position smoothing.
//!
//! Media sessions report positions coarsely and sometimes late. While a track
//! plays, the estimator extrapolates from the last accepted sample with a
//! monotonic clock and only jumps back to the reported value when it drifts
//! too far.

use std::time::Instant;

use tracing::debug;

/// Reported position ahead of the estimate by more than this resyncs.
pub const FORWARD_RESYNC_MS: i64 = 500;
/// Drift in either direction larger than this resyncs.
pub const ABSOLUTE_RESYNC_MS: i64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    position_ms: i64,
    at: Instant,
}

impl Anchor {
    fn project(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.at).as_millis() as i64;
        self.position_ms + elapsed
    }
}

/// Smoothed playback position.
#[derive(Debug, Clone, Default)]
pub struct PositionEstimator {
    offset_ms: i64,
    anchor: Option<Anchor>,
}

impl PositionEstimator {
    /// `offset_ms` is added to every raw sample and may be negative.
    pub const fn new(offset_ms: i64) -> Self {
        Self {
            offset_ms,
            anchor: None,
        }
    }

    pub const fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Whether the estimator is extrapolating from an anchor.
    pub const fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Feed one sample taken at `now` and return the estimated position.
    ///
    /// `track_changed` is true when the sample belongs to a different track
    /// than the previous one.
    pub fn observe(
        &mut self,
        raw_position_ms: i64,
        is_playing: bool,
        track_changed: bool,
        now: Instant,
    ) -> u64 {
        let sample = raw_position_ms.saturating_add(self.offset_ms);

        if !is_playing {
            self.anchor = None;
            return clamp(sample);
        }

        let anchor = match self.anchor {
            Some(anchor) if !track_changed => {
                let expected = anchor.project(now);
                let drift = sample - expected;
                if drift > FORWARD_RESYNC_MS || drift.abs() > ABSOLUTE_RESYNC_MS {
                    debug!("Resyncing position: drift {drift} ms");
                    Anchor {
                        position_ms: sample,
                        at: now,
                    }
                } else {
                    anchor
                }
            }
            _ => Anchor {
                position_ms: sample,
                at: now,
            },
        };

        self.anchor = Some(anchor);
        clamp(anchor.project(now))
    }
}

fn clamp(position_ms: i64) -> u64 {
    position_ms.max(0) as u64
}
