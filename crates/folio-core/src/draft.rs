use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{EditorError, StructureError};
use crate::extension::ExtensionRegistry;
use crate::node::{Attrs, Node, NodeData, NodeKey, TextData, TextFormat};
use crate::selection::{self, Point, Selection};
use crate::state::{EditorState, NodeTable};

/// The mutable working copy of an update. Starts as a shallow copy of the
/// committed state; nodes are copied on first write.
pub struct Draft {
    pub(crate) table: NodeTable,
    pub(crate) selection: Selection,
    registry: Arc<ExtensionRegistry>,
    dirty: BTreeSet<NodeKey>,
    modified: bool,
}

pub(crate) struct Savepoint {
    table: NodeTable,
    selection: Selection,
    dirty: BTreeSet<NodeKey>,
    modified: bool,
}

impl Draft {
    pub(crate) fn new(base: &EditorState, registry: Arc<ExtensionRegistry>) -> Self {
        Self {
            table: base.table.clone(),
            selection: base.selection.clone(),
            registry,
            dirty: BTreeSet::new(),
            modified: false,
        }
    }

    pub fn table(&self) -> &NodeTable {
        &self.table
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn root(&self) -> NodeKey {
        self.table.root()
    }

    pub fn get_latest(&self, key: NodeKey) -> Option<&Node> {
        self.table.get(key)
    }

    pub fn dirty(&self) -> &BTreeSet<NodeKey> {
        &self.dirty
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn savepoint(&self) -> Savepoint {
        Savepoint {
            table: self.table.clone(),
            selection: self.selection.clone(),
            dirty: self.dirty.clone(),
            modified: self.modified,
        }
    }

    pub(crate) fn restore(&mut self, savepoint: Savepoint) {
        self.table = savepoint.table;
        self.selection = savepoint.selection;
        self.dirty = savepoint.dirty;
        self.modified = savepoint.modified;
    }

    /// Replaces the whole draft with another snapshot. Used by undo/redo.
    pub(crate) fn reset_to(&mut self, state: &EditorState) {
        let changed: Vec<NodeKey> = self
            .table
            .keys()
            .chain(state.table.keys())
            .filter(|k| self.table.get_arc(*k).map(Arc::as_ptr) != state.table.get_arc(*k).map(Arc::as_ptr))
            .collect();
        self.dirty.extend(changed);
        self.table = state.table.clone();
        self.selection = state.selection.clone();
        self.modified = true;
    }

    pub(crate) fn into_parts(self) -> (NodeTable, Selection, BTreeSet<NodeKey>, bool) {
        (self.table, self.selection, self.dirty, self.modified)
    }

    fn touch(&mut self, key: NodeKey) {
        self.dirty.insert(key);
        self.modified = true;
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, EditorError> {
        self.touch(key);
        self.table
            .node_mut(key)
            .ok_or_else(|| StructureError::UnknownNode(key).into())
    }

    fn text_mut(&mut self, key: NodeKey) -> Result<&mut TextData, EditorError> {
        match &mut self.node_mut(key)?.data {
            NodeData::Text(text) => Ok(text),
            NodeData::Element(_) => {
                Err(StructureError::Invariant(format!("{key} is not a text node")).into())
            }
        }
    }

    fn text_len(&self, key: NodeKey) -> usize {
        self.table.get(key).map(Node::size).unwrap_or(0)
    }

    /// Allocates a detached node. Unattached nodes are dropped at commit.
    pub fn create_node(&mut self, data: NodeData) -> Result<NodeKey, EditorError> {
        if !self.registry.is_known_kind(data.kind()) {
            return Err(EditorError::UnknownNodeType {
                kind: data.kind().to_string(),
            });
        }
        let key = NodeKey::next();
        self.table.insert(Node::new(key, data));
        self.touch(key);
        Ok(key)
    }

    pub fn create_element(&mut self, kind: &str) -> Result<NodeKey, EditorError> {
        self.create_node(NodeData::element(kind))
    }

    pub fn create_element_with(&mut self, kind: &str, attrs: Attrs) -> Result<NodeKey, EditorError> {
        self.create_node(NodeData::element_with(kind, attrs))
    }

    pub fn create_text(&mut self, text: &str) -> Result<NodeKey, EditorError> {
        self.create_node(NodeData::text(text))
    }

    /// Inserts `key` as child `index` of `parent`, moving it when already
    /// attached elsewhere. For a move within the same parent `index` counts
    /// positions after the node has been taken out. Every check happens
    /// before anything is mutated.
    pub fn attach(&mut self, parent: NodeKey, key: NodeKey, index: usize) -> Result<(), EditorError> {
        let parent_node = self
            .table
            .get(parent)
            .ok_or(StructureError::UnknownNode(parent))?;
        let node = self.table.get(key).ok_or(StructureError::UnknownNode(key))?;
        if key == self.table.root() {
            return Err(StructureError::RootMutation.into());
        }
        if parent_node.is_text() {
            return Err(StructureError::NotAContainer(parent).into());
        }
        if self.table.is_ancestor_or_self(key, parent) {
            return Err(StructureError::Cycle { parent, child: key }.into());
        }
        if !self.registry.can_contain(parent_node.kind(), node.kind()) {
            return Err(StructureError::IncompatibleChild {
                parent: parent_node.kind().to_string(),
                child: node.kind().to_string(),
            }
            .into());
        }
        let len = parent_node.children.iter().filter(|k| **k != key).count();
        if index > len {
            return Err(StructureError::IndexOutOfRange { index, len }.into());
        }

        self.detach(key)?;
        self.node_mut(parent)?.children.insert(index, key);
        self.node_mut(key)?.parent = Some(parent);
        Ok(())
    }

    pub fn append(&mut self, parent: NodeKey, key: NodeKey) -> Result<(), EditorError> {
        let len = self
            .table
            .children(parent)
            .iter()
            .filter(|k| **k != key)
            .count();
        self.attach(parent, key, len)
    }

    pub fn insert_after(&mut self, sibling: NodeKey, key: NodeKey) -> Result<(), EditorError> {
        self.insert_beside(sibling, key, 1)
    }

    pub fn insert_before(&mut self, sibling: NodeKey, key: NodeKey) -> Result<(), EditorError> {
        self.insert_beside(sibling, key, 0)
    }

    fn insert_beside(&mut self, sibling: NodeKey, key: NodeKey, shift: usize) -> Result<(), EditorError> {
        let parent = self
            .table
            .parent(sibling)
            .ok_or(StructureError::Detached(sibling))?;
        let index = self
            .table
            .children(parent)
            .iter()
            .filter(|k| **k != key)
            .position(|k| *k == sibling)
            .ok_or(StructureError::Detached(sibling))?;
        self.attach(parent, key, index + shift)
    }

    fn detach(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let Some(parent) = self.table.parent(key) else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|k| *k != key);
        self.node_mut(key)?.parent = None;
        Ok(())
    }

    /// Detaches `key` and drops it with all descendants. A selection that
    /// pointed into the removed subtree is remapped right away.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        if key == self.table.root() {
            return Err(StructureError::RootMutation.into());
        }
        if !self.table.contains(key) {
            return Err(StructureError::UnknownNode(key).into());
        }
        let removed: HashSet<NodeKey> = self.table.subtree(key).into_iter().collect();
        let hits_selection =
            removed.contains(&self.selection.anchor.key) || removed.contains(&self.selection.focus.key);
        let before = hits_selection.then(|| self.table.clone());

        self.detach(key)?;
        for k in &removed {
            self.table.remove_entry(*k);
            self.dirty.remove(k);
        }
        self.modified = true;

        if let Some(before) = before {
            self.selection = selection::normalize(&self.selection, &before, &self.table);
        }
        Ok(())
    }

    /// Removes `key`, then any container left empty by that, up to the
    /// first text block or the root.
    pub fn remove_and_prune(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let mut target = key;
        loop {
            let parent = self.table.parent(target);
            self.remove(target)?;
            match parent {
                Some(parent)
                    if parent != self.table.root()
                        && self.table.children(parent).is_empty()
                        && !self
                            .table
                            .kind(parent)
                            .is_some_and(|k| self.registry.is_text_block(k)) =>
                {
                    target = parent;
                }
                _ => return Ok(()),
            }
        }
    }

    pub(crate) fn collect_garbage(&mut self) -> usize {
        let stray = self.table.unreachable();
        for key in &stray {
            self.table.remove_entry(*key);
            self.dirty.remove(key);
        }
        stray.len()
    }

    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), EditorError> {
        let len = self.text_len(key);
        let text = text.into();
        self.splice_text(key, 0, len, &text)
    }

    /// Replaces `delete` characters at `offset` with `insert`. Selection
    /// points after the edit shift with it.
    pub fn splice_text(
        &mut self,
        key: NodeKey,
        offset: usize,
        delete: usize,
        insert: &str,
    ) -> Result<(), EditorError> {
        let data = self.text_mut(key)?;
        let len = data.text.chars().count();
        let offset = offset.min(len);
        let delete = delete.min(len - offset);
        let start = byte_index(&data.text, offset);
        let end = byte_index(&data.text, offset + delete);
        data.text.replace_range(start..end, insert);

        let inserted = insert.chars().count();
        for point in [&mut self.selection.anchor, &mut self.selection.focus] {
            if point.key != key || point.offset <= offset {
                continue;
            }
            point.offset = if point.offset < offset + delete {
                offset
            } else {
                point.offset - delete + inserted
            };
        }
        Ok(())
    }

    /// Splits a text node at `offset`. The node keeps the head; the tail
    /// moves to a new sibling, which is returned.
    pub fn split_text(&mut self, key: NodeKey, offset: usize) -> Result<NodeKey, EditorError> {
        let source = self
            .table
            .get(key)
            .and_then(Node::as_text)
            .cloned()
            .ok_or_else(|| StructureError::Invariant(format!("{key} is not a text node")))?;
        let split = byte_index(&source.text, offset);
        let tail = TextData {
            text: source.text[split..].to_string(),
            format: source.format,
            style: source.style.clone(),
        };
        let right = self.create_node(NodeData::Text(tail))?;
        self.insert_after(key, right)?;
        self.text_mut(key)?.text.truncate(split);

        for point in [&mut self.selection.anchor, &mut self.selection.focus] {
            if point.key == key && point.offset > offset {
                *point = Point::text(right, point.offset - offset);
            }
        }
        Ok(right)
    }

    /// Appends `right`'s text onto `left` and removes `right`. Both must be
    /// adjacent text siblings.
    pub fn merge_text(&mut self, left: NodeKey, right: NodeKey) -> Result<(), EditorError> {
        let left_len = self.text_len(left);
        let tail = self
            .table
            .get(right)
            .and_then(Node::as_text)
            .map(|t| t.text.clone())
            .ok_or_else(|| StructureError::Invariant(format!("{right} is not a text node")))?;
        let parent = self.table.parent(right);
        let right_ix = self.table.index_in_parent(right);
        self.text_mut(left)?.text.push_str(&tail);

        for point in [&mut self.selection.anchor, &mut self.selection.focus] {
            if point.key == right {
                *point = Point::text(left, left_len + point.offset);
            } else if Some(point.key) == parent
                && right_ix.is_some_and(|ix| point.offset > ix)
            {
                point.offset -= 1;
            }
        }
        self.remove(right)
    }

    pub fn set_format(&mut self, key: NodeKey, format: TextFormat) -> Result<(), EditorError> {
        self.text_mut(key)?.format = format;
        Ok(())
    }

    pub fn set_style(&mut self, key: NodeKey, style: impl Into<String>) -> Result<(), EditorError> {
        self.text_mut(key)?.style = style.into();
        Ok(())
    }

    /// Sets or clears an element attribute. Writes that would not change the
    /// value leave the node untouched.
    pub fn set_attr(&mut self, key: NodeKey, name: &str, value: Option<Value>) -> Result<(), EditorError> {
        let current = self.table.get(key).ok_or(StructureError::UnknownNode(key))?;
        if current.attr(name) == value.as_ref() {
            return Ok(());
        }
        let NodeData::Element(el) = &mut self.node_mut(key)?.data else {
            return Err(StructureError::NotAContainer(key).into());
        };
        match value {
            Some(value) => el.attrs.insert(name.to_string(), value),
            None => el.attrs.remove(name),
        };
        Ok(())
    }

    /// Retypes an element in place, keeping its children and attributes.
    pub fn set_element_kind(&mut self, key: NodeKey, kind: &str) -> Result<(), EditorError> {
        if !self.registry.is_known_kind(kind) {
            return Err(EditorError::UnknownNodeType {
                kind: kind.to_string(),
            });
        }
        let node = self.table.get(key).ok_or(StructureError::UnknownNode(key))?;
        if node.is_text() {
            return Err(StructureError::Invariant(format!("{key} is not an element")).into());
        }
        if let Some(parent_kind) = node.parent.and_then(|p| self.table.kind(p)) {
            if !self.registry.can_contain(parent_kind, kind) {
                return Err(StructureError::IncompatibleChild {
                    parent: parent_kind.to_string(),
                    child: kind.to_string(),
                }
                .into());
            }
        }
        for child in &node.children {
            let child_kind = self.table.kind(*child).unwrap_or_default();
            if !self.registry.can_contain(kind, child_kind) {
                return Err(StructureError::IncompatibleChild {
                    parent: kind.to_string(),
                    child: child_kind.to_string(),
                }
                .into());
            }
        }
        if let NodeData::Element(el) = &mut self.node_mut(key)?.data {
            el.kind = kind.to_string();
        }
        Ok(())
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Selects a range. The caret format and style follow the anchor's text
    /// node.
    pub fn select(&mut self, anchor: Point, focus: Point) {
        let mut selection = Selection::new(anchor, focus);
        if let Some(text) = self.table.get(anchor.key).and_then(Node::as_text) {
            selection.format = text.format;
            selection.style = text.style.clone();
        }
        self.selection = selection;
    }

    pub fn select_collapsed(&mut self, point: Point) {
        self.select(point, point);
    }

    pub fn select_start(&mut self, key: NodeKey) {
        let point = match self.table.first_text(key) {
            Some(text) => Point::text(text, 0),
            None => Point::element(key, 0),
        };
        self.select_collapsed(point);
    }

    pub fn select_end(&mut self, key: NodeKey) {
        let point = match self.table.last_text(key) {
            Some(text) => Point::text(text, self.text_len(text)),
            None => Point::element(key, self.table.children(key).len()),
        };
        self.select_collapsed(point);
    }

    pub fn nodes_of_kind(&self, kind: &str) -> Vec<NodeKey> {
        self.table
            .subtree(self.table.root())
            .into_iter()
            .filter(|k| self.table.kind(*k) == Some(kind))
            .collect()
    }
}

/// Byte position of the `chars`-th character, clamped to the end.
pub(crate) fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(ix, _)| ix)
        .unwrap_or(text.len())
}
