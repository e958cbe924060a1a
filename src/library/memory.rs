//! In-memory library.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::record::{BookId, BookPlaybackState, BookRecord, NewBook};
use super::store::{BlobStore, RecordStore};
use crate::bookmark::{Bookmark, BookmarkId, NewBookmark};
use crate::epub::ChapterDescriptor;
use crate::error::{Error, Result};

/// Blob and record store held entirely in memory.
///
/// State sits behind a [`RwLock`], so every trait method works on `&self`
/// and one instance can be shared as both `Arc<dyn BlobStore>` and
/// `Arc<dyn RecordStore>`. Used by the CLI and by tests.
#[derive(Default)]
pub struct MemoryLibrary {
    state: RwLock<LibraryState>,
}

#[derive(Default)]
struct LibraryState {
    next_book: u64,
    next_bookmark: u64,
    books: HashMap<BookId, BookRecord>,
    chapters: HashMap<BookId, Vec<ChapterDescriptor>>,
    bookmarks: HashMap<BookmarkId, Bookmark>,
    blobs: HashMap<BookId, Arc<[u8]>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryLibrary {
    async fn put(&self, id: BookId, bytes: Arc<[u8]>) -> Result<()> {
        self.state.write().await.blobs.insert(id, bytes);
        Ok(())
    }

    async fn get(&self, id: BookId) -> Result<Option<Arc<[u8]>>> {
        Ok(self.state.read().await.blobs.get(&id).cloned())
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        self.state.write().await.blobs.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryLibrary {
    async fn insert_book(&self, book: NewBook) -> Result<BookId> {
        let mut state = self.state.write().await;
        state.next_book += 1;
        let id = BookId(state.next_book);
        state.books.insert(id, BookRecord::from_new(id, book));
        Ok(id)
    }

    async fn book(&self, id: BookId) -> Result<Option<BookRecord>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<BookRecord>> {
        let mut books: Vec<_> = self.state.read().await.books.values().cloned().collect();
        books.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));
        Ok(books)
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<BookId>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.filename == filename)
            .map(|b| b.id)
            .min())
    }

    async fn chapters(&self, id: BookId) -> Result<Vec<ChapterDescriptor>> {
        let mut chapters = self
            .state
            .read()
            .await
            .chapters
            .get(&id)
            .cloned()
            .unwrap_or_default();
        chapters.sort_by_key(|c| c.spine_index);
        Ok(chapters)
    }

    async fn replace_chapters(&self, id: BookId, chapters: Vec<ChapterDescriptor>) -> Result<()> {
        self.state.write().await.chapters.insert(id, chapters);
        Ok(())
    }

    async fn save_position(&self, id: BookId, position: BookPlaybackState) -> Result<()> {
        let mut state = self.state.write().await;
        let book = state.books.get_mut(&id).ok_or(Error::BookNotFound(id))?;
        book.position = position;
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        let mut state = self.state.write().await;
        state.books.remove(&id);
        state.chapters.remove(&id);
        state.bookmarks.retain(|_, b| b.book_id != id);
        Ok(())
    }

    async fn add_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkId> {
        let mut state = self.state.write().await;
        state.next_bookmark += 1;
        let id = BookmarkId(state.next_bookmark);
        state.bookmarks.insert(id, bookmark.into_bookmark(id));
        Ok(id)
    }

    async fn bookmarks(&self, book: BookId) -> Result<Vec<Bookmark>> {
        let mut bookmarks: Vec<_> = self
            .state
            .read()
            .await
            .bookmarks
            .values()
            .filter(|b| b.book_id == book)
            .cloned()
            .collect();
        bookmarks.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));
        Ok(bookmarks)
    }

    async fn remove_bookmark(&self, id: BookmarkId) -> Result<()> {
        self.state.write().await.bookmarks.remove(&id);
        Ok(())
    }
}
