//! Resumable sentence-by-sentence playback.
//!
//! [`PlaybackEngine`] walks a book one sentence at a time, handing each to a
//! [`Speaker`](crate::speech::Speaker) and advancing when the host reports
//! the utterance finished. Progress is published as [`PlaybackUpdate`]s.

mod cache;
mod engine;
mod update;

pub use cache::{SentenceCache, Sentences};
pub use engine::PlaybackEngine;
pub use update::{PlaybackConfig, PlaybackState, PlaybackUpdate, Position};
