use std::sync::Arc;

use tracing::{error, info, instrument};

use super::record::{BookId, BookRecord, NewBook};
use super::store::{BlobStore, RecordStore};
use crate::epub::{Archive, ParsedBook, display_name_for, parse_book};
use crate::error::{Error, Result};
use crate::util::now_millis;

/// Result of [`import_book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(BookRecord),
    /// A book with the same file name is already in the library.
    Duplicate(BookId),
}

/// Add an EPUB to the library.
///
/// Only names ending in `.epub` are accepted. The archive is parsed, the book
/// record and chapter list are written and the raw bytes are kept in the
/// blob store. If a later step fails, the partially written book is removed.
#[instrument(skip(blobs, records, bytes), fields(size = bytes.len()))]
pub async fn import_book(
    blobs: &dyn BlobStore,
    records: &dyn RecordStore,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<ImportOutcome> {
    let display_name = display_name_for(filename);
    if display_name.len() == filename.len() {
        return Err(Error::MalformedArchive(format!(
            "{filename} is not an .epub file"
        )));
    }

    if let Some(existing) = records.find_by_filename(filename).await? {
        info!(%existing, "already imported");
        return Ok(ImportOutcome::Duplicate(existing));
    }

    let bytes: Arc<[u8]> = bytes.into();
    let parsed = parse_blocking(Arc::clone(&bytes), display_name.to_string()).await?;
    let ParsedBook {
        title,
        author,
        cover,
        chapters,
    } = parsed;

    let id = records
        .insert_book(NewBook {
            title,
            author,
            filename: filename.to_string(),
            file_size: bytes.len() as u64,
            added_at: now_millis(),
            cover,
            chapter_count: chapters.len(),
        })
        .await?;

    let stored = async {
        records.replace_chapters(id, chapters).await?;
        blobs.put(id, bytes).await
    }
    .await;
    if let Err(e) = stored {
        error!(book_id = %id, error = %e, "import failed after insert, rolling back");
        remove_book(blobs, records, id).await?;
        return Err(e);
    }

    let record = records.book(id).await?.ok_or(Error::BookNotFound(id))?;
    info!(book_id = %id, title = %record.title, chapters = record.chapter_count, "imported");
    Ok(ImportOutcome::Imported(record))
}

/// Delete a book's record, chapters, bookmarks and archive.
pub async fn remove_book(
    blobs: &dyn BlobStore,
    records: &dyn RecordStore,
    id: BookId,
) -> Result<()> {
    records.delete_book(id).await?;
    blobs.delete(id).await
}

/// Zip inflation and markup parsing are CPU-bound; keep them off the async
/// executor.
async fn parse_blocking(bytes: Arc<[u8]>, display_name: String) -> Result<ParsedBook> {
    tokio::task::spawn_blocking(move || {
        let mut archive = Archive::from_bytes(bytes)?;
        parse_book(&mut archive, &display_name)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
