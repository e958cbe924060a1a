//! EPUB container support: archive access, package parsing and chapter lookup.

mod archive;
mod nav;
pub mod parser;
pub mod path;
mod reader;

pub use archive::{Archive, LocateStrategy};
pub use nav::{NavLink, parse_nav_document};
pub use reader::{
    CONTAINER_PATH, ChapterDescriptor, Cover, CoverStrategy, ParsedBook, TocSource,
    UNKNOWN_AUTHOR, display_name_for, parse_book, read_book,
};
