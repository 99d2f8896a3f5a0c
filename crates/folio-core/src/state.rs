use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::StructureError;
use crate::extension::ExtensionRegistry;
use crate::node::{Node, NodeData, NodeKey, ROOT_KIND, TextFormatType};
use crate::selection::{self, Point, Selection};
use crate::style::style_value;

/// Arena of nodes keyed by [`NodeKey`]. Nodes are shared between snapshots
/// through `Arc`; a draft copies a node only when it writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTable {
    root: NodeKey,
    nodes: HashMap<NodeKey, Arc<Node>>,
}

/// The part of one text node covered by a selection, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment {
    pub key: NodeKey,
    pub start: usize,
    pub end: usize,
}

impl TextSegment {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl NodeTable {
    pub(crate) fn with_root() -> Self {
        let key = NodeKey::next();
        let mut nodes = HashMap::new();
        nodes.insert(key, Arc::new(Node::new(key, NodeData::element(ROOT_KIND))));
        Self { root: key, nodes }
    }

    pub(crate) fn insert(&mut self, node: Node) {
        self.nodes.insert(node.key, Arc::new(node));
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(&key).map(Arc::make_mut)
    }

    pub(crate) fn remove_entry(&mut self, key: NodeKey) -> Option<Arc<Node>> {
        self.nodes.remove(&key)
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key).map(Arc::as_ref)
    }

    pub fn get_arc(&self, key: NodeKey) -> Option<&Arc<Node>> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes shared with `other` compare by pointer first.
    pub fn differs_from(&self, other: &NodeTable) -> bool {
        self.root != other.root
            || self.nodes.len() != other.nodes.len()
            || self.nodes.iter().any(|(key, node)| match other.nodes.get(key) {
                Some(theirs) => !Arc::ptr_eq(node, theirs) && node != theirs,
                None => true,
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    pub fn kind(&self, key: NodeKey) -> Option<&str> {
        self.get(key).map(Node::kind)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key).and_then(|node| node.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.get(key).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|k| *k == key)
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let ix = self.index_in_parent(key)?;
        self.children(parent).get(ix + 1).copied()
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let ix = self.index_in_parent(key)?;
        ix.checked_sub(1)
            .and_then(|ix| self.children(parent).get(ix).copied())
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            if k == ancestor {
                return true;
            }
            cursor = self.parent(k);
        }
        false
    }

    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.contains(key) && self.is_ancestor_or_self(self.root, key)
    }

    /// Child indices from the root down to `key`. `None` for detached nodes.
    pub fn path(&self, key: NodeKey) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cursor = key;
        while cursor != self.root {
            path.push(self.index_in_parent(cursor)?);
            cursor = self.parent(cursor)?;
        }
        path.reverse();
        Some(path)
    }

    /// Document order of two points. Points on detached nodes compare equal.
    pub fn compare_points(&self, a: &Point, b: &Point) -> Ordering {
        let (Some(mut pa), Some(mut pb)) = (self.path(a.key), self.path(b.key)) else {
            return Ordering::Equal;
        };
        pa.push(a.offset);
        pb.push(b.offset);
        pa.cmp(&pb)
    }

    pub fn nearest(&self, key: NodeKey, mut pred: impl FnMut(&Node) -> bool) -> Option<NodeKey> {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            let node = self.get(k)?;
            if pred(node) {
                return Some(k);
            }
            cursor = node.parent;
        }
        None
    }

    /// The root child containing `key`. `None` for the root itself.
    pub fn top_level(&self, key: NodeKey) -> Option<NodeKey> {
        let mut cursor = key;
        loop {
            let parent = self.parent(cursor)?;
            if parent == self.root {
                return Some(cursor);
            }
            cursor = parent;
        }
    }

    /// Preorder walk of the subtree rooted at `key`, including `key`.
    pub fn subtree(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if !self.contains(k) {
                continue;
            }
            out.push(k);
            stack.extend(self.children(k).iter().rev().copied());
        }
        out
    }

    pub fn text_nodes(&self) -> Vec<NodeKey> {
        self.subtree(self.root)
            .into_iter()
            .filter(|k| self.get(*k).is_some_and(Node::is_text))
            .collect()
    }

    pub fn first_text(&self, key: NodeKey) -> Option<NodeKey> {
        self.subtree(key)
            .into_iter()
            .find(|k| self.get(*k).is_some_and(Node::is_text))
    }

    pub fn last_text(&self, key: NodeKey) -> Option<NodeKey> {
        self.subtree(key)
            .into_iter()
            .rev()
            .find(|k| self.get(*k).is_some_and(Node::is_text))
    }

    /// Resolves an element point to the text point at the same boundary.
    pub fn text_point(&self, point: &Point) -> Option<Point> {
        let node = self.get(point.key)?;
        if node.is_text() {
            return Some(Point::text(point.key, point.offset.min(node.size())));
        }
        let children = &node.children;
        if let Some(next) = children.get(point.offset) {
            if let Some(text) = self.first_text(*next) {
                return Some(Point::text(text, 0));
            }
        }
        let prev = point.offset.min(children.len()).checked_sub(1)?;
        let text = self.last_text(children[prev])?;
        Some(Point::text(text, self.get(text)?.size()))
    }

    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.collect_text(key, &mut out);
        out
    }

    fn collect_text(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.get(key) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => out.push_str(&t.text),
            NodeData::Element(_) => {
                let mut after_element = false;
                for child in &node.children {
                    let child_is_text = self.get(*child).is_some_and(Node::is_text);
                    if !out.is_empty() && (after_element || !child_is_text) && !out.ends_with('\n')
                    {
                        out.push('\n');
                    }
                    self.collect_text(*child, out);
                    after_element = !child_is_text;
                }
            }
        }
    }

    /// Text covered by the selection, one entry per text node in document
    /// order. Boundary nodes may yield empty segments.
    pub fn text_segments(&self, selection: &Selection) -> Vec<TextSegment> {
        let (start, end) = selection.ordered(self);
        let mut out = Vec::new();
        for key in self.text_nodes() {
            let Some(len) = self.get(key).map(Node::size) else {
                continue;
            };
            let node_start = Point::text(key, 0);
            let node_end = Point::text(key, len);
            let from = if start.key == key {
                start.offset.min(len)
            } else if self.compare_points(&node_start, &start) != Ordering::Less {
                0
            } else {
                continue;
            };
            let to = if end.key == key {
                end.offset.min(len)
            } else if self.compare_points(&node_end, &end) != Ordering::Greater {
                len
            } else {
                continue;
            };
            if from <= to {
                out.push(TextSegment {
                    key,
                    start: from,
                    end: to,
                });
            }
        }
        out
    }

    /// Segments that actually cover characters, or every boundary segment
    /// when nothing is covered.
    pub fn effective_segments(&self, selection: &Selection) -> Vec<TextSegment> {
        let segments = self.text_segments(selection);
        let covered: Vec<TextSegment> = segments.iter().copied().filter(|s| !s.is_empty()).collect();
        if covered.is_empty() {
            segments
        } else {
            covered
        }
    }

    pub fn selection_text(&self, selection: &Selection) -> String {
        let mut out = String::new();
        let mut last_parent = None;
        for seg in self.text_segments(selection) {
            let Some(node) = self.get(seg.key) else {
                continue;
            };
            if last_parent.is_some() && last_parent != node.parent {
                out.push('\n');
            }
            last_parent = node.parent;
            if let Some(text) = node.as_text() {
                out.extend(text.text.chars().skip(seg.start).take(seg.end - seg.start));
            }
        }
        out
    }

    pub fn unreachable(&self) -> Vec<NodeKey> {
        let reachable: HashSet<NodeKey> = self.subtree(self.root).into_iter().collect();
        self.nodes
            .keys()
            .filter(|k| !reachable.contains(k))
            .copied()
            .collect()
    }

    /// Checks the tree shape: one root, consistent parent links, no cycles,
    /// no stray nodes, and every child permitted by its parent's spec.
    pub fn validate(&self, registry: &ExtensionRegistry) -> Result<(), StructureError> {
        let root = self
            .get(self.root)
            .ok_or(StructureError::UnknownNode(self.root))?;
        if root.parent.is_some() || root.kind() != ROOT_KIND {
            return Err(StructureError::Invariant(format!(
                "{} is not a detached root",
                self.root
            )));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                return Err(StructureError::Invariant(format!(
                    "{key} is reachable more than once"
                )));
            }
            let node = self.get(key).ok_or(StructureError::UnknownNode(key))?;
            if node.is_text() && !node.children.is_empty() {
                return Err(StructureError::NotAContainer(key));
            }
            for child in &node.children {
                let child_node = self
                    .get(*child)
                    .ok_or(StructureError::UnknownNode(*child))?;
                if child_node.parent != Some(key) {
                    return Err(StructureError::Invariant(format!(
                        "{child} does not point back to {key}"
                    )));
                }
                if !registry.can_contain(node.kind(), child_node.kind()) {
                    return Err(StructureError::IncompatibleChild {
                        parent: node.kind().to_string(),
                        child: child_node.kind().to_string(),
                    });
                }
                stack.push(*child);
            }
        }

        if let Some(stray) = self.nodes.keys().find(|k| !seen.contains(k)) {
            return Err(StructureError::Detached(*stray));
        }
        Ok(())
    }
}

/// Immutable snapshot of the document and selection, handed out behind
/// `Arc`. Equality compares content, not identity.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub(crate) table: NodeTable,
    pub(crate) selection: Selection,
}

impl EditorState {
    pub(crate) fn new(table: NodeTable, selection: Selection) -> Self {
        Self { table, selection }
    }

    pub fn table(&self) -> &NodeTable {
        &self.table
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn root(&self) -> NodeKey {
        self.table.root()
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.table.get(key)
    }

    pub fn text_content(&self) -> String {
        self.table.text_content(self.table.root())
    }

    pub fn selection_text(&self) -> String {
        self.table.selection_text(&self.selection)
    }

    pub fn is_backward(&self) -> bool {
        self.selection.is_backward(&self.table)
    }

    /// The node a range operation targets; see [`selection::resolve_node_for_merge`].
    pub fn selected_node(&self) -> NodeKey {
        selection::resolve_node_for_merge(&self.selection, &self.table)
    }

    pub fn selection_has_format(&self, ty: TextFormatType) -> bool {
        if self.selection.is_collapsed() {
            return self.selection.format.has(ty);
        }
        let segments: Vec<TextSegment> = self
            .table
            .text_segments(&self.selection)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return self.selection.format.has(ty);
        }
        segments.iter().all(|seg| {
            self.table
                .get(seg.key)
                .and_then(Node::as_text)
                .is_some_and(|t| t.format.has(ty))
        })
    }

    /// Value of a CSS property across the selection, or `""` when the
    /// selected text disagrees.
    pub fn selection_style_value(&self, prop: &str, default: &str) -> String {
        if self.selection.is_collapsed() && !self.selection.style.is_empty() {
            return style_value(&self.selection.style, prop).unwrap_or_else(|| default.to_string());
        }
        let mut value: Option<String> = None;
        for seg in self.table.effective_segments(&self.selection) {
            let Some(text) = self.table.get(seg.key).and_then(Node::as_text) else {
                continue;
            };
            let current = style_value(&text.style, prop).unwrap_or_else(|| default.to_string());
            match &value {
                None => value = Some(current),
                Some(existing) if *existing != current => return String::new(),
                Some(_) => {}
            }
        }
        value.unwrap_or_else(|| default.to_string())
    }
}
