use std::sync::Arc;

use tracing::debug;

use super::record::BookId;
use super::store::BlobStore;
use crate::epub::Archive;
use crate::error::{Error, Result};
use crate::text::chapter_sentences;

/// Load one chapter of a stored book as speakable sentences.
///
/// The archive is re-opened from the blob store and the chapter found with
/// [`Archive::locate`]. A missing blob is [`Error::BookNotFound`]; anything
/// wrong with the chapter itself is [`Error::ChapterLoad`].
pub async fn load_chapter_sentences(
    blobs: &dyn BlobStore,
    book_id: BookId,
    href: &str,
) -> Result<Vec<String>> {
    let bytes = blobs
        .get(book_id)
        .await?
        .ok_or(Error::BookNotFound(book_id))?;

    let href = href.to_string();
    let sentences = tokio::task::spawn_blocking(move || sentences_from_archive(bytes, &href))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

    debug!(%book_id, sentences = sentences.len(), "loaded chapter");
    Ok(sentences)
}

fn sentences_from_archive(bytes: Arc<[u8]>, href: &str) -> Result<Vec<String>> {
    let mut archive = Archive::from_bytes(bytes).map_err(|e| Error::chapter_load(href, e))?;
    let markup = archive.read_chapter(href)?;
    Ok(chapter_sentences(&markup))
}
