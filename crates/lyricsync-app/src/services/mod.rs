//! Runtime services.
//!
//! - [`media`]: media session input and control commands
//! - [`lyrics`]: the polling loop producing display updates
//! - [`relay`]: output of those updates

pub mod lyrics;
pub mod media;
pub mod relay;

pub use lyrics::{DisplaySettings, LyricsService};
pub use media::LineSource;
pub use relay::LineRelay;
