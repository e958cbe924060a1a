//! Error types for recital operations.

use thiserror::Error;

use crate::library::BookId;

/// Errors that can occur while importing, reading or playing a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The archive has no container descriptor or package document.
    #[error("Invalid EPUB: {0}")]
    MalformedArchive(String),

    /// A chapter could not be located or decoded. Playback skips it.
    #[error("Failed to load chapter {href}: {reason}")]
    ChapterLoad { href: String, reason: String },

    /// The speech capability rejected an utterance. Playback skips it.
    #[error("Utterance failed: {0}")]
    Utterance(String),

    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn chapter_load(href: &str, reason: impl ToString) -> Self {
        Error::ChapterLoad {
            href: href.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
