use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epub::Cover;

/// Library-assigned book identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted reading cursor of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPlaybackState {
    pub last_chapter_index: usize,
    pub last_sentence_index: usize,
}

impl BookPlaybackState {
    pub fn new(last_chapter_index: usize, last_sentence_index: usize) -> Self {
        Self {
            last_chapter_index,
            last_sentence_index,
        }
    }

    /// True once the cursor has moved off the very first sentence.
    pub fn is_started(&self) -> bool {
        self.last_chapter_index > 0 || self.last_sentence_index > 0
    }
}

/// A book as written at import time, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub filename: String,
    pub file_size: u64,
    /// Milliseconds since the Unix epoch.
    pub added_at: u64,
    pub cover: Option<Cover>,
    pub chapter_count: usize,
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub filename: String,
    pub file_size: u64,
    pub added_at: u64,
    pub cover: Option<Cover>,
    pub chapter_count: usize,
    pub position: BookPlaybackState,
}

impl BookRecord {
    pub fn from_new(id: BookId, book: NewBook) -> Self {
        Self {
            id,
            title: book.title,
            author: book.author,
            filename: book.filename,
            file_size: book.file_size,
            added_at: book.added_at,
            cover: book.cover,
            chapter_count: book.chapter_count,
            position: BookPlaybackState::default(),
        }
    }

    /// "Ch. X of Y" once reading has started, "Y chapters" when unread and
    /// empty for a book without chapters.
    pub fn progress_label(&self) -> String {
        if self.chapter_count == 0 {
            return String::new();
        }
        if self.position.is_started() {
            format!(
                "Ch. {} of {}",
                self.position.last_chapter_index + 1,
                self.chapter_count
            )
        } else {
            format!("{} chapters", self.chapter_count)
        }
    }

    /// Share of chapters before the cursor, 0 to 100.
    pub fn progress_percent(&self) -> f64 {
        if self.chapter_count == 0 {
            return 0.0;
        }
        let percent =
            self.position.last_chapter_index as f64 / self.chapter_count as f64 * 100.0;
        percent.min(100.0)
    }
}
