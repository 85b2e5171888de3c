//! Media session input.
//!
//! The shipped source reads newline-delimited JSON snapshots from stdin:
//!
//! ```text
//! {"title":"Song","artist":"Band","raw_position_ms":61234,"duration_ms":215000,"is_playing":true}
//! ```
//!
//! Control lines such as `wordsync:on` may be interleaved with snapshots.

use lyricsync_core::MediaSnapshot;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Display-mode commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    WordSync(bool),
    ToggleWordSync,
}

impl Control {
    /// Parse a control line. Case and surrounding whitespace are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "wordsync:on" => Some(Self::WordSync(true)),
            "wordsync:off" => Some(Self::WordSync(false)),
            "wordsync:toggle" => Some(Self::ToggleWordSync),
            _ => None,
        }
    }
}

/// One decoded input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Snapshot(MediaSnapshot),
    Control(Control),
}

impl Inbound {
    /// Decode a line. Blank and unrecognized lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(control) = Control::parse(trimmed) {
            return Some(Self::Control(control));
        }

        match serde_json::from_str::<MediaSnapshot>(trimmed) {
            Ok(snapshot) => Some(Self::Snapshot(snapshot)),
            Err(e) => {
                warn!("Ignoring unrecognized input line: {e}");
                None
            }
        }
    }
}

/// Where playback state comes from.
pub trait MediaSource {
    /// Most recent snapshot, if one has been seen.
    fn snapshot(&mut self) -> Option<MediaSnapshot>;

    /// Next pending control command.
    fn next_control(&mut self) -> Option<Control>;

    /// Whether the source has ended.
    fn is_closed(&self) -> bool;
}

/// [`MediaSource`] fed by a line reader, normally stdin.
///
/// Only the latest snapshot is kept; older ones are overwritten before the
/// polling loop sees them.
pub struct LineSource {
    snapshots: watch::Receiver<Option<MediaSnapshot>>,
    controls: mpsc::UnboundedReceiver<Control>,
}

impl LineSource {
    /// Read from stdin on a background task.
    pub fn stdin() -> Self {
        Self::spawn(BufReader::new(tokio::io::stdin()))
    }

    /// Read from `reader` on a background task.
    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (snapshot_tx, snapshots) = watch::channel(None);
        let (control_tx, controls) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match Inbound::parse(&line) {
                        Some(Inbound::Snapshot(snapshot)) => {
                            snapshot_tx.send_replace(Some(snapshot));
                        }
                        Some(Inbound::Control(control)) => {
                            debug!("Control: {control:?}");
                            let _ = control_tx.send(control);
                        }
                        None => {}
                    },
                    Ok(None) => {
                        info!("Media input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read media input: {e}");
                        break;
                    }
                }
            }
        });

        Self {
            snapshots,
            controls,
        }
    }
}

impl MediaSource for LineSource {
    fn snapshot(&mut self) -> Option<MediaSnapshot> {
        self.snapshots.borrow_and_update().clone()
    }

    fn next_control(&mut self) -> Option<Control> {
        self.controls.try_recv().ok()
    }

    fn is_closed(&self) -> bool {
        self.snapshots.has_changed().is_err()
    }
}
