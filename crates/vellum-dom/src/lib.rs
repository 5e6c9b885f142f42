//! Arena-based element tree for the Vellum renderer.
//!
//! The tree produced by the HTML tree-construction stage and consumed by the
//! cascade and render stages. It follows the shape of the
//! [DOM Living Standard](https://dom.spec.whatwg.org/) tree model without
//! being a DOM: no namespaces, no live collections, no mutation events.
//!
//! # Design
//!
//! All nodes live in one arena and reference each other through [`NodeId`]
//! indices. Parent, children, and siblings are indices, which gives O(1)
//! traversal in every direction, avoids reference cycles entirely, and lets
//! an entire document be freed as a unit when it is discarded or re-parsed.

use std::collections::HashSet;
use std::fmt::Write as _;

/// An insertion-ordered attribute list with first-wins uniqueness on name.
///
/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
/// requires that when a tag carries two attributes with the same name, "the
/// new attribute must be removed from the token" — the first occurrence
/// wins. Downstream consumers (widget blueprints, counters) also read
/// attributes in source order, so a hash map will not do here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrList {
    entries: Vec<(String, String)>,
}

impl AttrList {
    /// Create an empty attribute list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert an attribute. Returns `false` (and keeps the existing value)
    /// if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if an attribute with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no attributes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for AttrList {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            let _ = attrs.insert(name, value);
        }
        attrs
    }
}

/// A type-safe index into the element tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// Element-specific data: the lowercased tag name plus the attribute list.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// The element's local name, lowercased ASCII.
    pub tag_name: String,
    /// The element's attributes, in source order.
    pub attrs: AttrList,
}

impl ElementData {
    /// Create element data from a tag name and attributes.
    #[must_use]
    pub const fn new(tag_name: String, attrs: AttrList) -> Self {
        Self { tag_name, attrs }
    }

    /// The element's `id` attribute value, if present.
    ///
    /// [HTML § 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The id attribute specifies its element's unique identifier (ID)."
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id")
    }

    /// The set of class names from the `class` attribute.
    ///
    /// "The class attribute, if specified, must have a value that is a set
    /// of space-separated tokens."
    #[must_use]
    pub fn classes(&self) -> HashSet<&str> {
        self.attrs.get("class").map_or_else(HashSet::new, |list| {
            list.split_ascii_whitespace().collect()
        })
    }
}

/// The kind of a tree node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root. Exactly one per tree, at [`NodeId::ROOT`].
    Document,
    /// A detached fragment root, used for `<template>` contents.
    DocumentFragment,
    /// An element with a tag name and attributes.
    Element(ElementData),
    /// A text node with its character data.
    Text(String),
    /// A comment node with its data.
    Comment(String),
}

/// A node in the element tree.
///
/// Relationships are stored as arena indices so the tree can be walked in
/// any direction without borrowing conflicts.
#[derive(Debug, Clone)]
pub struct Node {
    /// What kind of node this is, with its payload.
    pub kind: NodeKind,
    /// The parent node, or `None` for the root and detached nodes.
    pub parent: Option<NodeId>,
    /// Ordered child list.
    pub children: Vec<NodeId>,
    /// The sibling immediately following this node under the same parent.
    pub next_sibling: Option<NodeId>,
    /// The sibling immediately preceding this node under the same parent.
    pub prev_sibling: Option<NodeId>,
}

/// The element tree arena.
///
/// The document node is created up front at [`NodeId::ROOT`]; every other
/// node is allocated with [`NodeArena::alloc`] and attached with
/// [`NodeArena::append_child`] or [`NodeArena::insert_before`].
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Create a new arena holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                next_sibling: None,
                prev_sibling: None,
            }],
        }
    }

    /// The document node's id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes in the arena (including detached ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the document node exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new, detached node and return its id.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// Allocate a detached element node.
    pub fn alloc_element(&mut self, tag_name: impl Into<String>, attrs: AttrList) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag_name.into(), attrs)))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// [DOM § 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append):
    /// "To append a node to a parent, pre-insert node into parent before
    /// null." Sibling links are maintained alongside the child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.nodes[parent.0].children.last().copied();
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        if let Some(prev) = prev_last {
            self.nodes[prev.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev);
        }
    }

    /// Insert `child` into `parent`'s child list immediately before
    /// `before`. Falls back to appending when `before` is not a child of
    /// `parent`.
    ///
    /// This is the insertion primitive foster parenting needs: displaced
    /// table content lands immediately before the table element.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        let Some(pos) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == before)
        else {
            self.append_child(parent, child);
            return;
        };
        self.nodes[parent.0].children.insert(pos, child);
        self.nodes[child.0].parent = Some(parent);
        let prev = pos.checked_sub(1).map(|i| self.nodes[parent.0].children[i]);
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = Some(before);
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = Some(child);
        }
        self.nodes[before.0].prev_sibling = Some(child);
    }

    /// Append character data under `parent`, eagerly merging with a
    /// trailing text sibling.
    ///
    /// Adjacent text siblings never survive under one parent: if the last
    /// child of `parent` is already a text node, the data is appended to it
    /// instead of allocating a sibling.
    pub fn append_text(&mut self, parent: NodeId, data: &str) {
        if data.is_empty() {
            return;
        }
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(data);
            return;
        }
        let text = self.alloc(NodeKind::Text(data.to_string()));
        self.append_child(parent, text);
    }

    /// Insert character data immediately before `before` under `parent`,
    /// merging with the preceding text sibling when there is one.
    ///
    /// Foster-parented text uses this; the merge keeps the eager-coalescing
    /// invariant intact even for displaced table text.
    pub fn insert_text_before(&mut self, parent: NodeId, data: &str, before: NodeId) {
        if data.is_empty() {
            return;
        }
        if let Some(prev) = self.nodes[before.0].prev_sibling
            && let NodeKind::Text(existing) = &mut self.nodes[prev.0].kind
        {
            existing.push_str(data);
            return;
        }
        let text = self.alloc(NodeKind::Text(data.to_string()));
        self.insert_before(parent, text, before);
    }

    /// The parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// All children of a node, in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// The first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// The last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// The next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// The previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Walk up the parent chain to check an ancestor relationship.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterator over ancestors from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            arena: self,
            current: self.parent(id),
        }
    }

    /// Iterator over preceding siblings, nearest first.
    #[must_use]
    pub fn preceding_siblings(&self, id: NodeId) -> PrecedingSiblingIterator<'_> {
        PrecedingSiblingIterator {
            arena: self,
            current: self.prev_sibling(id),
        }
    }

    /// Iterator over all descendants in document order (depth-first,
    /// pre-order), excluding the starting node.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> DescendantIterator<'_> {
        DescendantIterator {
            arena: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Iterate over every node in the tree in document order, root first.
    pub fn iter_all(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.root()).chain(self.descendants(self.root()))
    }

    /// Element data if the node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Mutable element data if the node is an element.
    ///
    /// The tree builder uses this to merge attributes from a repeated
    /// `<html>` or `<body>` start tag into the existing element.
    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| match &mut n.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Text content if the node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.kind {
            NodeKind::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The node's name: the tag name for elements, `#document`,
    /// `#document-fragment`, `#text`, or `#comment` otherwise.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> &str {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(data)) => data.tag_name.as_str(),
            Some(NodeKind::Text(_)) => "#text",
            Some(NodeKind::Comment(_)) => "#comment",
            Some(NodeKind::DocumentFragment) => "#document-fragment",
            Some(NodeKind::Document) | None => "#document",
        }
    }

    /// The document element (in practice, `<html>`), if present.
    ///
    /// [HTML § 3.1.1](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2):
    /// "The document element of a document is the element whose parent is
    /// that document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    /// The `<body>` (or `<frameset>`) element, if present.
    ///
    /// [HTML § 3.1.3](https://html.spec.whatwg.org/multipage/dom.html#the-body-element-2):
    /// "The body element of a document is the first of the html element's
    /// children that is either a body element or a frameset element."
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .find(|&&id| {
                self.as_element(id)
                    .is_some_and(|e| e.tag_name == "body" || e.tag_name == "frameset")
            })
            .copied()
    }

    /// Render the subtree below `id` as an indented outline, for debugging.
    #[must_use]
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(data)) => {
                let _ = write!(out, "<{}", data.tag_name);
                for (name, value) in data.attrs.iter() {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push_str(">\n");
            }
            Some(NodeKind::Text(s)) => {
                let _ = writeln!(out, "#text {s:?}");
            }
            Some(NodeKind::Comment(s)) => {
                let _ = writeln!(out, "#comment {s:?}");
            }
            Some(NodeKind::DocumentFragment) => out.push_str("#document-fragment\n"),
            Some(NodeKind::Document) | None => out.push_str("#document\n"),
        }
        for &child in self.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's ancestors, parent first.
pub struct AncestorIterator<'a> {
    arena: &'a NodeArena,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.arena.parent(id);
        Some(id)
    }
}

/// Iterator over a node's preceding siblings, nearest first.
pub struct PrecedingSiblingIterator<'a> {
    arena: &'a NodeArena,
    current: Option<NodeId>,
}

impl Iterator for PrecedingSiblingIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.arena.prev_sibling(id);
        Some(id)
    }
}

/// Iterator over a node's descendants in document order.
pub struct DescendantIterator<'a> {
    arena: &'a NodeArena,
    /// Children are pushed in reverse so popping yields left-to-right order.
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.arena.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(arena: &mut NodeArena, tag: &str) -> NodeId {
        arena.alloc_element(tag, AttrList::new())
    }

    #[test]
    fn append_text_merges_adjacent_runs() {
        let mut arena = NodeArena::new();
        let p = element(&mut arena, "p");
        arena.append_child(NodeId::ROOT, p);
        arena.append_text(p, "Hello");
        arena.append_text(p, ", world");

        assert_eq!(arena.children(p).len(), 1);
        let text = arena.children(p)[0];
        assert_eq!(arena.as_text(text), Some("Hello, world"));
    }

    #[test]
    fn append_text_does_not_merge_across_elements() {
        let mut arena = NodeArena::new();
        let p = element(&mut arena, "p");
        arena.append_child(NodeId::ROOT, p);
        arena.append_text(p, "a");
        let br = element(&mut arena, "br");
        arena.append_child(p, br);
        arena.append_text(p, "b");

        assert_eq!(arena.children(p).len(), 3);
    }

    #[test]
    fn insert_before_maintains_sibling_links() {
        let mut arena = NodeArena::new();
        let body = element(&mut arena, "body");
        arena.append_child(NodeId::ROOT, body);
        let table = element(&mut arena, "table");
        arena.append_child(body, table);
        let div = element(&mut arena, "div");
        arena.insert_before(body, div, table);

        assert_eq!(arena.children(body), &[div, table]);
        assert_eq!(arena.next_sibling(div), Some(table));
        assert_eq!(arena.prev_sibling(table), Some(div));
        assert_eq!(arena.parent(div), Some(body));
    }

    #[test]
    fn every_node_reaches_the_document_root() {
        let mut arena = NodeArena::new();
        let html = element(&mut arena, "html");
        arena.append_child(NodeId::ROOT, html);
        let body = element(&mut arena, "body");
        arena.append_child(html, body);
        arena.append_text(body, "x");

        for id in arena.iter_all() {
            if id == NodeId::ROOT {
                continue;
            }
            let parent = arena.parent(id).expect("non-root node has a parent");
            assert!(arena.children(parent).contains(&id));
            assert_eq!(arena.ancestors(id).last(), Some(NodeId::ROOT));
        }
    }

    #[test]
    fn attr_list_keeps_first_duplicate() {
        let mut attrs = AttrList::new();
        assert!(attrs.insert("href", "/a"));
        assert!(!attrs.insert("href", "/b"));
        assert_eq!(attrs.get("href"), Some("/a"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn node_names_for_non_elements() {
        let mut arena = NodeArena::new();
        let text = arena.alloc(NodeKind::Text("hi".into()));
        let comment = arena.alloc(NodeKind::Comment("c".into()));
        assert_eq!(arena.node_name(NodeId::ROOT), "#document");
        assert_eq!(arena.node_name(text), "#text");
        assert_eq!(arena.node_name(comment), "#comment");
    }
}
