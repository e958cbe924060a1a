//! Arena DOM built by html5ever.
//!
//! Chapter markup and EPUB 3 navigation documents are parsed into a flat
//! arena. Every element is classified once into a [`TagKind`] at creation,
//! so the text walkers never compare tag names while traversing.

mod arena;
mod tag;
mod tree_sink;

pub use arena::{Attribute, Descendants, Dom, Node, NodeData, NodeId};
pub use tag::TagKind;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::ArenaSink;

/// Parse an HTML or XHTML document leniently, the way a browser would.
pub fn parse_html(html: &str) -> Dom {
    parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}
