//! # recital
//!
//! Read EPUB books aloud, one sentence at a time.
//!
//! ## Features
//!
//! - Parse EPUB 2/3 containers into an ordered chapter list with titles
//!   from the navigation document or the legacy NCX
//! - Extract readable prose from chapter markup and split it into sentences
//! - Drive a resumable playback session against any speech synthesizer
//! - Keep a library of imported books, reading positions and bookmarks
//!
//! ## Quick Start
//!
//! ```no_run
//! use recital::read_book;
//!
//! let book = read_book("input.epub").unwrap();
//! println!("{} by {}", book.title, book.author);
//! for chapter in &book.chapters {
//!     println!("{:>3}. {}", chapter.spine_index, chapter.title);
//! }
//! ```
//!
//! ## Sentences
//!
//! ```
//! use recital::tokenize_sentences;
//!
//! let sentences = tokenize_sentences("Dr. Smith went home. He left at 3.5pm.");
//! assert_eq!(sentences, vec!["Dr. Smith went home.", "He left at 3.5pm."]);
//! ```
//!
//! ## Playback
//!
//! [`PlaybackEngine`] needs a [`BlobStore`] and a [`RecordStore`] holding
//! imported books, plus a [`Speaker`]. The host forwards each
//! [`SpeechEvent`] to [`PlaybackEngine::handle_speech`] and renders the
//! [`PlaybackUpdate`]s it receives.

pub mod bookmark;
pub mod dom;
pub mod epub;
pub mod error;
pub mod io;
pub mod library;
pub mod playback;
pub mod settings;
pub mod speech;
pub mod text;
pub(crate) mod util;

pub use bookmark::{Bookmark, BookmarkId, NewBookmark};
pub use epub::{Archive, ChapterDescriptor, Cover, ParsedBook, read_book};
pub use error::{Error, Result};
pub use library::{
    BlobStore, BookId, BookPlaybackState, BookRecord, ImportOutcome, MemoryLibrary, RecordStore,
    import_book, remove_book,
};
pub use playback::{PlaybackConfig, PlaybackEngine, PlaybackState, PlaybackUpdate, Position};
pub use settings::{SettingScope, SettingsLayers, VoiceSettings};
pub use speech::{SpeechError, SpeechEvent, SpeechOutcome, Speaker, Utterance, UtteranceId};
pub use text::{chapter_sentences, extract_paragraphs, tokenize_sentences};
