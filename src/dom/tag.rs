use html5ever::LocalName;

/// How the text walkers treat an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// A block that can hold a paragraph of prose.
    Block,
    /// Markup that never carries readable prose (scripts, styles, nav blocks).
    Stripped,
    /// Everything else: inline formatting and structural wrappers.
    Transparent,
}

impl TagKind {
    /// Classify an HTML element by its local name.
    pub fn of(local_name: &LocalName) -> TagKind {
        match local_name.as_ref() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => TagKind::Block,
            "li" | "blockquote" => TagKind::Block,
            "td" | "th" | "caption" | "figcaption" => TagKind::Block,
            "dt" | "dd" => TagKind::Block,

            "script" | "style" | "nav" => TagKind::Stripped,

            _ => TagKind::Transparent,
        }
    }

    pub fn is_block(self) -> bool {
        self == TagKind::Block
    }
}
