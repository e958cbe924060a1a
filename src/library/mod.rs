//! Book library: persisted records, archive blobs, import and removal.
//!
//! Storage is abstracted behind [`BlobStore`] and [`RecordStore`] so hosts
//! can back it with whatever they have; [`MemoryLibrary`] implements both.

mod content;
mod import;
mod memory;
mod record;
mod store;

pub use content::load_chapter_sentences;
pub use import::{ImportOutcome, import_book, remove_book};
pub use memory::MemoryLibrary;
pub use record::{BookId, BookPlaybackState, BookRecord, NewBook};
pub use store::{BlobStore, RecordStore};

pub use crate::epub::ChapterDescriptor;
