#![forbid(unsafe_code)]

//! Headless document model.
//!
//! [`Document`] is an arena of element and text nodes with just enough of the
//! DOM to host overlays: tree structure, attributes, inline styles, focus,
//! media playback state and host-supplied layout boxes.
//!
//! # Invariants
//!
//! - A node has at most one parent and appears exactly once in that parent's
//!   child list.
//! - A node is never inserted into its own subtree.
//! - The active element is either `None` (focus on the body) or a connected
//!   node. Detaching a subtree that holds focus resets it to `None`.
//! - `NodeId`s are never reused; detached nodes stay addressable so they can
//!   be re-inserted later.
//!
//! # Geometry
//!
//! The host owns layout. Each node carries a `layout` rectangle (its base
//! placement, in viewport coordinates) and an `offset` translation applied on
//! top of it. [`Document::bounding_rect`] is the translated layout box, the
//! headless counterpart of `getBoundingClientRect()`.

use std::collections::BTreeMap;

use crate::geometry::{Point, Rect, Size};

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw arena index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Structural errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("cannot insert {child:?} into its own subtree at {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("{reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },
    #[error("node {0:?} is not connected to the document")]
    NotConnected(NodeId),
}

const TEXT_TAG: &str = "#text";

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    layout: Rect,
    offset: Point,
    media_playing: bool,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            text: None,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            layout: Rect::default(),
            offset: Point::ORIGIN,
            media_playing: false,
        }
    }
}

/// Arena-backed document tree with focus and viewport state.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    viewport: Size,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Size::new(1024.0, 768.0))
    }
}

impl Document {
    /// Create a document containing `<html><body></body></html>`.
    #[must_use]
    pub fn new(viewport: Size) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            active: None,
            viewport,
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        doc.nodes[root.index()].children.push(body);
        doc.nodes[body.index()].parent = Some(root);
        doc.nodes[body.index()].layout = Rect::from_size(viewport);
        doc.root = root;
        doc.body = body;
        doc
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Resize the viewport. The body's layout box follows it.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        let body = self.body;
        self.nodes[body.index()].layout = Rect::from_size(viewport);
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if self.get(id).is_some() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(id))
        }
    }

    // --- Construction ---

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::element(tag));
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        let id = self.create_element(TEXT_TAG);
        self.nodes[id.index()].text = Some(text.into());
        id
    }

    /// Deep-clone `id` and its subtree. The clone is detached and paused.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let source = self.get(id).ok_or(DomError::UnknownNode(id))?.clone();
        let clone = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            media_playing: false,
            ..source.clone()
        });
        for child in source.children {
            let child_clone = self.deep_clone(child)?;
            self.nodes[child_clone.index()].parent = Some(clone);
            self.nodes[clone.index()].children.push(child_clone);
        }
        Ok(clone)
    }

    // --- Tree queries ---

    /// Lowercase tag name, `#text` for text nodes, empty for unknown ids.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> &str {
        self.get(id).map(|n| n.tag.as_str()).unwrap_or("")
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.tag != TEXT_TAG)
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| n.text.as_deref())
    }

    /// Concatenated text of the subtree, in document order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of `id` in its parent's child list.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    /// Inclusive ancestry test.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Whether the node is reachable from the document root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.contains(self.root, id)
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// First connected element whose `id` attribute equals `element_id`.
    #[must_use]
    pub fn find_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attribute(*n, "id") == Some(element_id))
    }

    /// Nearest inclusive ancestor carrying attribute `name`.
    #[must_use]
    pub fn closest_with_attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.has_attribute(current, name) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Descendants of `scope` carrying attribute `name`, in document order.
    #[must_use]
    pub fn query_attribute(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.has_attribute(*n, name))
            .collect()
    }

    // --- Tree mutation ---

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or last when `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, reference });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);
        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|c| *c == reference)
                .ok_or(DomError::NotAChild { parent, reference })?,
            None => self.children(parent).len(),
        };
        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        if let Some(active) = self.active
            && !self.is_connected(active)
        {
            self.active = None;
        }
        Ok(())
    }

    /// Detach `id` from its parent. Focus inside the subtree falls back to the body.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(active) = self.active
            && self.contains(id, active)
        {
            self.active = None;
        }
        self.detach(id);
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    // --- Attributes and styles ---

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get(id).is_some_and(|n| n.attributes.contains_key(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.attributes.insert(name.to_owned(), value.into());
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.get_mut(id).and_then(|n| n.attributes.remove(name))
    }

    #[must_use]
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.styles.get(property))
            .map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.styles.insert(property.to_owned(), value.into());
        }
    }

    /// Remove an inline style property, returning its previous value.
    pub fn remove_style(&mut self, id: NodeId, property: &str) -> Option<String> {
        self.get_mut(id).and_then(|n| n.styles.remove(property))
    }

    // --- Focus ---

    /// The focused node, `None` when focus rests on the body.
    #[must_use]
    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    /// Move focus to `id`.
    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.check(id)?;
        if !self.is_connected(id) {
            return Err(DomError::NotConnected(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    // --- Geometry ---

    #[must_use]
    pub fn layout(&self, id: NodeId) -> Rect {
        self.get(id).map(|n| n.layout).unwrap_or_default()
    }

    /// Set the host-computed base placement of a node.
    pub fn set_layout(&mut self, id: NodeId, rect: Rect) {
        if let Some(node) = self.get_mut(id) {
            node.layout = rect;
        }
    }

    #[must_use]
    pub fn offset(&self, id: NodeId) -> Point {
        self.get(id).map(|n| n.offset).unwrap_or_default()
    }

    /// Set the translation applied on top of the layout box.
    pub fn set_offset(&mut self, id: NodeId, offset: Point) {
        if let Some(node) = self.get_mut(id) {
            node.offset = offset;
        }
    }

    /// Layout box translated by the node's offset.
    #[must_use]
    pub fn bounding_rect(&self, id: NodeId) -> Rect {
        self.get(id)
            .map(|n| n.layout.translated(n.offset))
            .unwrap_or_default()
    }

    // --- Media ---

    #[must_use]
    pub fn is_media(&self, id: NodeId) -> bool {
        matches!(self.tag(id), "video" | "audio")
    }

    /// Start playback. Ignored for non-media nodes.
    pub fn play_media(&mut self, id: NodeId) {
        if self.is_media(id)
            && let Some(node) = self.get_mut(id)
        {
            node.media_playing = true;
        }
    }

    pub fn pause_media(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.media_playing = false;
        }
    }

    #[must_use]
    pub fn is_media_playing(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.media_playing)
    }
}
