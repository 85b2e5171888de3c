//! # lyricsync-core
//!
//! Core types and error handling shared by the lyricsync crates.

pub mod error;
pub mod types;

pub use error::{Error, HttpError, Result};
pub use types::*;
