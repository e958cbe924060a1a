use crate::dom::{Dom, NodeId, TagKind, parse_html};
use crate::util::normalize_whitespace;

/// Parse chapter markup and return its readable paragraphs.
///
/// Text is captured from leaf blocks only (blocks with no block-level
/// descendant), so nested prose is never read twice. Scripts, styles and
/// `<nav>` blocks are ignored. Markup with no recognised block structure
/// yields its whole body text as a single paragraph.
pub fn extract_paragraphs(markup: &str) -> Vec<String> {
    let dom = parse_html(markup);
    let Some(body) = dom.body() else {
        return Vec::new();
    };

    let has_block_below = block_containers(&dom, body);
    let mut paragraphs = Vec::new();
    let mut stack: Vec<NodeId> = dom.children(body).collect();
    stack.reverse();
    while let Some(node) = stack.pop() {
        match dom.tag_kind(node) {
            None | Some(TagKind::Stripped) => {}
            Some(TagKind::Block) if !has_block_below[index(node)] => {
                let text = readable_text(&dom, node);
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
            Some(_) => {
                let start = stack.len();
                stack.extend(dom.children(node));
                stack[start..].reverse();
            }
        }
    }

    if paragraphs.is_empty() {
        let text = readable_text(&dom, body);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }

    paragraphs
}

/// For every node under `root`, whether a block element sits somewhere
/// below it. Indexed by node id.
fn block_containers(dom: &Dom, root: NodeId) -> Vec<bool> {
    let mut below = vec![false; dom.len()];
    let preorder: Vec<NodeId> = dom.descendants(root).collect();
    // Reverse pre-order visits every child before its parent.
    for &id in preorder.iter().rev() {
        let marks_parent = below[index(id)] || dom.tag_kind(id).is_some_and(TagKind::is_block);
        if marks_parent
            && let Some(parent) = dom.get(id).map(|n| n.parent).filter(NodeId::is_some)
        {
            below[index(parent)] = true;
        }
    }
    below
}

fn index(id: NodeId) -> usize {
    id.0 as usize
}

fn readable_text(dom: &Dom, node: NodeId) -> String {
    let mut raw = String::new();
    dom.collect_text(node, true, &mut raw);
    normalize_whitespace(&raw)
}
