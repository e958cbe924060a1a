use std::sync::Arc;

use async_trait::async_trait;

use super::record::{BookId, BookPlaybackState, BookRecord, NewBook};
use crate::bookmark::{Bookmark, BookmarkId, NewBookmark};
use crate::epub::ChapterDescriptor;
use crate::error::Result;

/// Raw archive storage, keyed by book.
///
/// Archives are kept verbatim so chapters can be re-parsed on demand.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, id: BookId, bytes: Arc<[u8]>) -> Result<()>;

    /// The stored archive, or `None` when the book has no blob.
    async fn get(&self, id: BookId) -> Result<Option<Arc<[u8]>>>;

    async fn delete(&self, id: BookId) -> Result<()>;
}

/// Structured book, chapter and bookmark records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a new book with a zeroed reading position and return its id.
    async fn insert_book(&self, book: NewBook) -> Result<BookId>;

    async fn book(&self, id: BookId) -> Result<Option<BookRecord>>;

    /// Every book, most recently added first.
    async fn list_books(&self) -> Result<Vec<BookRecord>>;

    async fn find_by_filename(&self, filename: &str) -> Result<Option<BookId>>;

    /// The book's chapters ordered by `spine_index`.
    async fn chapters(&self, id: BookId) -> Result<Vec<ChapterDescriptor>>;

    /// Replace the book's chapter list wholesale.
    async fn replace_chapters(&self, id: BookId, chapters: Vec<ChapterDescriptor>) -> Result<()>;

    /// Fails with [`Error::BookNotFound`](crate::Error::BookNotFound) for an
    /// unknown book.
    async fn save_position(&self, id: BookId, position: BookPlaybackState) -> Result<()>;

    /// Remove the book together with its chapters and bookmarks.
    async fn delete_book(&self, id: BookId) -> Result<()>;

    async fn add_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkId>;

    /// The book's bookmarks, newest first.
    async fn bookmarks(&self, book: BookId) -> Result<Vec<Bookmark>>;

    async fn remove_bookmark(&self, id: BookmarkId) -> Result<()>;
}
