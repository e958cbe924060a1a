//! Saved reading positions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::library::BookId;
use crate::playback::Position;
use crate::util::now_millis;

/// Longest excerpt kept with a bookmark, in characters.
pub const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub u64);

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub book_id: BookId,
    pub chap_idx: usize,
    pub sent_idx: usize,
    pub chapter_title: String,
    pub excerpt: String,
    /// Milliseconds since the Unix epoch.
    pub added_at: u64,
}

/// A bookmark before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub book_id: BookId,
    pub chap_idx: usize,
    pub sent_idx: usize,
    pub chapter_title: String,
    pub excerpt: String,
    pub added_at: u64,
}

impl NewBookmark {
    /// Bookmark the engine's current position, stamped with the current time.
    pub fn from_position(book_id: BookId, position: &Position) -> Self {
        Self {
            book_id,
            chap_idx: position.chap_idx,
            sent_idx: position.sent_idx,
            chapter_title: position.chapter_title.clone(),
            excerpt: truncate_excerpt(&position.sentence),
            added_at: now_millis(),
        }
    }

    pub fn into_bookmark(self, id: BookmarkId) -> Bookmark {
        Bookmark {
            id,
            book_id: self.book_id,
            chap_idx: self.chap_idx,
            sent_idx: self.sent_idx,
            chapter_title: self.chapter_title,
            excerpt: truncate_excerpt(&self.excerpt),
            added_at: self.added_at,
        }
    }
}

fn truncate_excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
