use html5ever::{LocalName, QualName};

use super::tag::TagKind;
use crate::util::normalize_whitespace;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        kind: TagKind,
    },
    Text(String),
    /// Comments and processing instructions. Kept so html5ever has a handle.
    Comment,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-allocated document tree. Links between nodes are indices.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the document root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let kind = TagKind::of(&name.local);
        self.alloc(Node::new(NodeData::Element { name, attrs, kind }))
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self) -> NodeId {
        self.alloc(Node::new(NodeData::Comment))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last_child;
            node.next_sibling = NodeId::NONE;
        }
        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }
        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text to the trailing text node of `parent`, creating one if needed.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings. The node stays in the arena.
    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            dom: self,
            current: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Pre-order traversal of everything below `root` (excluding `root`).
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        Descendants { dom: self, stack }
    }

    /// First element below `root`, in document order, matching `predicate`.
    pub fn find<F>(&self, root: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&LocalName, &[Attribute]) -> bool,
    {
        self.descendants(root).find(|&id| match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { name, attrs, .. }) => predicate(&name.local, attrs),
            _ => false,
        })
    }

    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.find(root, |name, _| name.as_ref() == tag)
    }

    /// The `<body>` element, if the parser produced one.
    pub fn body(&self) -> Option<NodeId> {
        self.find_by_tag(self.document, "body")
    }

    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        match &self.get(id)?.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        }
    }

    pub fn tag_kind(&self, id: NodeId) -> Option<TagKind> {
        match &self.get(id)?.data {
            NodeData::Element { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of every text node below `root`, skipping
    /// [`TagKind::Stripped`] subtrees when `skip_stripped` is set.
    pub fn collect_text(&self, root: NodeId, skip_stripped: bool, out: &mut String) {
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            match self.get(id).map(|n| &n.data) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(NodeData::Element { kind, .. })
                    if !(skip_stripped && *kind == TagKind::Stripped) =>
                {
                    let start = stack.len();
                    stack.extend(self.children(id));
                    stack[start..].reverse();
                }
                _ => {}
            }
        }
    }

    /// Whitespace-normalized text content of `root`.
    pub fn text_content(&self, root: NodeId) -> String {
        let mut raw = String::new();
        self.collect_text(root, false, &mut raw);
        normalize_whitespace(&raw)
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.dom.get(id).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(id)
    }
}

pub struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(self.dom.children(id));
        self.stack[start..].reverse();
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use html5ever::ns;

    use super::*;

    fn element(dom: &mut Dom, tag: &str) -> NodeId {
        dom.create_element(QualName::new(None, ns!(html), LocalName::from(tag)), Vec::new())
    }

    #[test]
    fn test_append_and_children() {
        let mut dom = Dom::new();
        let body = element(&mut dom, "body");
        let p1 = element(&mut dom, "p");
        let p2 = element(&mut dom, "p");
        dom.append(dom.document(), body);
        dom.append(body, p1);
        dom.append(body, p2);

        assert_eq!(dom.children(body).collect::<Vec<_>>(), vec![p1, p2]);
        assert_eq!(dom.tag_kind(p1), Some(TagKind::Block));
        assert_eq!(dom.body(), Some(body));
    }

    #[test]
    fn test_append_text_merges_adjacent_runs() {
        let mut dom = Dom::new();
        let p = element(&mut dom, "p");
        dom.append(dom.document(), p);
        dom.append_text(p, "Hello, ");
        dom.append_text(p, "world");

        assert_eq!(dom.children(p).count(), 1);
        assert_eq!(dom.text_content(p), "Hello, world");
    }

    #[test]
    fn test_detach_relinks_siblings() {
        let mut dom = Dom::new();
        let div = element(&mut dom, "div");
        let a = element(&mut dom, "a");
        let b = element(&mut dom, "b");
        let c = element(&mut dom, "i");
        dom.append(dom.document(), div);
        for child in [a, b, c] {
            dom.append(div, child);
        }

        dom.detach(b);
        assert_eq!(dom.children(div).collect::<Vec<_>>(), vec![a, c]);

        dom.detach(a);
        dom.detach(c);
        assert_eq!(dom.children(div).count(), 0);
    }

    #[test]
    fn test_insert_before_first_child() {
        let mut dom = Dom::new();
        let div = element(&mut dom, "div");
        let a = element(&mut dom, "a");
        let b = element(&mut dom, "b");
        dom.append(dom.document(), div);
        dom.append(div, b);
        dom.insert_before(b, a);

        assert_eq!(dom.children(div).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_descendants_are_preorder() {
        let mut dom = Dom::new();
        let div = element(&mut dom, "div");
        let p = element(&mut dom, "p");
        let em = element(&mut dom, "em");
        let li = element(&mut dom, "li");
        dom.append(dom.document(), div);
        dom.append(div, p);
        dom.append(p, em);
        dom.append(div, li);

        let order: Vec<_> = dom.descendants(dom.document()).collect();
        assert_eq!(order, vec![div, p, em, li]);
    }

    #[test]
    fn test_collect_text_on_deep_chain() {
        let mut dom = Dom::new();
        let body = element(&mut dom, "body");
        dom.append(dom.document(), body);
        let mut parent = body;
        for _ in 0..100_000 {
            let span = element(&mut dom, "span");
            dom.append(parent, span);
            parent = span;
        }
        dom.append_text(parent, "bottom");
        let script = element(&mut dom, "script");
        dom.append(body, script);
        dom.append_text(script, "hidden()");

        let mut text = String::new();
        dom.collect_text(body, true, &mut text);
        assert_eq!(text, "bottom");

        text.clear();
        dom.collect_text(body, false, &mut text);
        assert_eq!(text, "bottomhidden()");
    }
}
