//! EPUB 3 navigation document parsing.

use crate::dom::{Dom, NodeId, parse_html};

/// One `<a href>` from the table of contents. `href` is the raw reference,
/// relative to the navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Collect the links of a navigation document's table of contents, in
/// document order.
///
/// The `<nav epub:type="toc">` block is preferred; an untyped document uses
/// its first `<nav>`. A document without any `<nav>` yields no links.
pub fn parse_nav_document(markup: &str) -> Vec<NavLink> {
    let dom = parse_html(markup);
    let Some(nav) = toc_nav(&dom) else {
        return Vec::new();
    };

    dom.descendants(nav)
        .filter(|&id| dom.element_name(id).is_some_and(|name| name.as_ref() == "a"))
        .filter_map(|id| {
            let href = dom.get_attr(id, "href")?;
            Some(NavLink {
                label: dom.text_content(id),
                href: href.to_string(),
            })
        })
        .collect()
}

fn toc_nav(dom: &Dom) -> Option<NodeId> {
    let root = dom.document();
    dom.find(root, |name, attrs| {
        name.as_ref() == "nav"
            && attrs.iter().any(|a| {
                matches!(a.name.local.as_ref(), "epub:type" | "type")
                    && a.value.split_ascii_whitespace().any(|t| t == "toc")
            })
    })
    .or_else(|| dom.find_by_tag(root, "nav"))
}
