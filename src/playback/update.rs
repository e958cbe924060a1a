use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine lifecycle.
///
/// `Idle` is both the state before [`open`](super::PlaybackEngine::open)
/// and after [`destroy`](super::PlaybackEngine::destroy).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a book is loaded and the cursor may be moved.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Stopped)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published on every state or cursor change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackUpdate {
    pub state: PlaybackState,
    pub chap_idx: usize,
    pub sent_idx: usize,
    pub total_chapters: usize,
    pub chapter_title: String,
    /// Sentence at the cursor when its chapter is cached, else empty.
    pub current_sentence: String,
}

/// Cursor snapshot for bookmarking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub chap_idx: usize,
    pub sent_idx: usize,
    pub chapter_title: String,
    /// Sentence at the cursor when its chapter is cached, else empty.
    pub sentence: String,
}

/// Tunables for the playback loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Persist the cursor whenever the sentence index becomes a multiple of
    /// this. Zero disables mid-chapter checkpoints.
    pub checkpoint_interval: usize,
    /// Spoken in place of a chapter with no extractable sentences.
    pub empty_chapter_placeholder: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 5,
            empty_chapter_placeholder: "(No readable text in this chapter.)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlaybackState::Paused).unwrap(), "\"paused\"");
        assert_eq!(PlaybackState::Stopped.to_string(), "stopped");
        assert!(!PlaybackState::Loading.is_ready());
        assert!(PlaybackState::Paused.is_ready());
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: PlaybackConfig = serde_json::from_str(r#"{"checkpoint_interval": 10}"#).unwrap();
        assert_eq!(config.checkpoint_interval, 10);
        assert_eq!(config.empty_chapter_placeholder, "(No readable text in this chapter.)");
    }
}
