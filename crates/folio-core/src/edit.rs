//! Selection-driven editing operations behind the built-in commands.

use serde_json::Value;

use crate::draft::Draft;
use crate::error::{EditorError, StructureError};
use crate::node::{
    Attrs, BlockType, ElementFormat, HEADING_KIND, HORIZONTAL_RULE_KIND, LIST_ITEM_KIND, LIST_KIND,
    ListType, Node, NodeData, NodeKey, PARAGRAPH_KIND, QUOTE_KIND, TextData, TextFormatType,
};
use crate::selection::Point;
use crate::state::TextSegment;
use crate::style::StylePatch;

/// Attributes that survive a block conversion.
const CARRIED_ATTRS: [&str; 2] = ["format", "indent"];

impl Draft {
    fn kind_of(&self, key: NodeKey) -> &str {
        self.table.kind(key).unwrap_or_default()
    }

    fn is_text_block_key(&self, key: NodeKey) -> bool {
        self.registry().is_text_block(self.kind_of(key))
    }

    pub fn block_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.table
            .nearest(key, |node| self.registry().is_text_block(node.kind()))
    }

    fn point_block(&self, point: &Point) -> Option<NodeKey> {
        let key = self
            .table
            .text_point(point)
            .map(|p| p.key)
            .unwrap_or(point.key);
        self.block_of(key)
    }

    fn leaf_blocks(&self) -> Vec<NodeKey> {
        self.table
            .subtree(self.root())
            .into_iter()
            .filter(|k| {
                let kind = self.kind_of(*k);
                self.registry().is_text_block(kind) || self.registry().is_void(kind)
            })
            .collect()
    }

    pub fn selected_blocks(&self) -> Vec<NodeKey> {
        let (start, end) = self.selection.ordered(&self.table);
        let (Some(first), Some(last)) = (self.point_block(&start), self.point_block(&end)) else {
            return self.point_block(&start).into_iter().collect();
        };
        let blocks: Vec<NodeKey> = self
            .table
            .subtree(self.root())
            .into_iter()
            .filter(|k| self.is_text_block_key(*k))
            .collect();
        let (Some(from), Some(to)) = (
            blocks.iter().position(|k| *k == first),
            blocks.iter().position(|k| *k == last),
        ) else {
            return vec![first];
        };
        blocks[from.min(to)..=from.max(to)].to_vec()
    }

    fn carried_attrs(&self, key: NodeKey) -> Attrs {
        self.table
            .get(key)
            .and_then(Node::as_element)
            .map(|el| {
                el.attrs
                    .iter()
                    .filter(|(name, _)| CARRIED_ATTRS.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn non_empty_segments(&self) -> Vec<TextSegment> {
        self.table
            .text_segments(&self.selection)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Splits text nodes so each segment is a whole node; returns those
    /// nodes in order.
    fn isolate_segments(&mut self, segments: &[TextSegment]) -> Result<Vec<NodeKey>, EditorError> {
        let mut out = Vec::with_capacity(segments.len());
        for seg in segments {
            let len = self.table.get(seg.key).map(Node::size).unwrap_or(0);
            let mut key = seg.key;
            if seg.end < len {
                self.split_text(key, seg.end)?;
            }
            if seg.start > 0 {
                key = self.split_text(key, seg.start)?;
            }
            out.push(key);
        }
        Ok(out)
    }

    fn select_nodes(&mut self, keys: &[NodeKey], backward: bool) {
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return;
        };
        let start = Point::text(*first, 0);
        let end = Point::text(*last, self.table.get(*last).map(Node::size).unwrap_or(0));
        if backward {
            self.select(end, start);
        } else {
            self.select(start, end);
        }
    }

    /// Toggles an inline format. A collapsed caret only changes the format
    /// of text typed next. A range turns the format off when every selected
    /// character already has it, on otherwise.
    pub fn format_text(&mut self, ty: TextFormatType) -> Result<(), EditorError> {
        let segments = self.non_empty_segments();
        if self.selection.is_collapsed() || segments.is_empty() {
            self.selection.format = self.selection.format.toggled(ty);
            return Ok(());
        }
        let on = !segments.iter().all(|seg| {
            self.table
                .get(seg.key)
                .and_then(Node::as_text)
                .is_some_and(|t| t.format.has(ty))
        });
        let backward = self.selection.is_backward(&self.table);
        let keys = self.isolate_segments(&segments)?;
        for key in &keys {
            let format = self
                .table
                .get(*key)
                .and_then(Node::as_text)
                .map(|t| t.format)
                .unwrap_or_default();
            self.set_format(*key, format.with(ty, on))?;
        }
        self.select_nodes(&keys, backward);
        self.selection.format = self.selection.format.with(ty, on);
        Ok(())
    }

    pub fn patch_text_style(&mut self, patch: &StylePatch) -> Result<(), EditorError> {
        let segments = self.non_empty_segments();
        if self.selection.is_collapsed() || segments.is_empty() {
            self.selection.style = patch.apply(&self.selection.style);
            return Ok(());
        }
        let backward = self.selection.is_backward(&self.table);
        let keys = self.isolate_segments(&segments)?;
        for key in &keys {
            let style = self
                .table
                .get(*key)
                .and_then(Node::as_text)
                .map(|t| patch.apply(&t.style))
                .unwrap_or_default();
            self.set_style(*key, style)?;
        }
        self.select_nodes(&keys, backward);
        Ok(())
    }

    pub fn format_element(&mut self, format: ElementFormat) -> Result<(), EditorError> {
        for block in self.selected_blocks() {
            self.set_attr(block, "format", Some(Value::from(format.as_str())))?;
        }
        Ok(())
    }

    /// Converts every selected block. List items are lifted out of their
    /// list first.
    pub fn set_blocks_type(&mut self, block_type: BlockType) -> Result<(), EditorError> {
        let (kind, level) = match block_type {
            BlockType::Paragraph => (PARAGRAPH_KIND, None),
            BlockType::Heading(level) => (HEADING_KIND, Some(level.clamp(1, 6))),
            BlockType::Quote => (QUOTE_KIND, None),
        };
        for block in self.selected_blocks() {
            let block = if self.kind_of(block) == LIST_ITEM_KIND {
                self.lift_list_item(block)?
            } else {
                block
            };
            self.set_element_kind(block, kind)?;
            self.set_attr(block, "level", level.map(Value::from))?;
        }
        Ok(())
    }

    /// Replaces a list item with a paragraph placed after its list. Items
    /// below it move to a new list after the paragraph.
    pub(crate) fn lift_list_item(&mut self, item: NodeKey) -> Result<NodeKey, EditorError> {
        let list = self
            .table
            .parent(item)
            .ok_or(StructureError::Detached(item))?;
        let top = self.table.top_level(list).ok_or(StructureError::Detached(list))?;
        let paragraph = self.create_element_with(PARAGRAPH_KIND, self.carried_attrs(item))?;

        let mut nested = Vec::new();
        for child in self.table.children(item).to_vec() {
            if self.kind_of(child) == LIST_KIND {
                nested.push(child);
            } else {
                self.append(paragraph, child)?;
            }
        }

        self.insert_after(top, paragraph)?;
        let mut cursor = paragraph;
        for child in nested {
            self.insert_after(cursor, child)?;
            cursor = child;
        }
        if top == list {
            let ix = self.table.index_in_parent(item).unwrap_or_default();
            let tail: Vec<NodeKey> = self.table.children(list)[ix + 1..].to_vec();
            if !tail.is_empty() {
                let attrs = self
                    .table
                    .get(list)
                    .and_then(Node::as_element)
                    .map(|el| el.attrs.clone())
                    .unwrap_or_default();
                let rest = self.create_element_with(LIST_KIND, attrs)?;
                self.insert_after(cursor, rest)?;
                for moved in tail {
                    self.append(rest, moved)?;
                }
            }
        }

        self.remove(item)?;
        if self.table.children(list).is_empty() {
            self.remove_and_prune(list)?;
        }
        Ok(paragraph)
    }

    /// Turns the selected blocks into items of a `list_type` list. Blocks
    /// already in a list switch that list's type instead.
    pub fn insert_list(&mut self, list_type: ListType) -> Result<(), EditorError> {
        let mut open: Option<NodeKey> = None;
        for block in self.selected_blocks() {
            if self.kind_of(block) == LIST_ITEM_KIND {
                let list = self
                    .table
                    .parent(block)
                    .ok_or(StructureError::Detached(block))?;
                self.set_attr(list, "list_type", Some(Value::from(list_type.as_str())))?;
                open = None;
                continue;
            }

            let mut attrs = self.carried_attrs(block);
            if list_type == ListType::Check {
                attrs.insert("checked".to_string(), Value::Bool(false));
            }
            let item = self.create_element_with(LIST_ITEM_KIND, attrs)?;
            for child in self.table.children(block).to_vec() {
                self.append(item, child)?;
            }

            let list = match open {
                Some(list) if self.table.next_sibling(list) == Some(block) => list,
                _ => {
                    let mut attrs = Attrs::new();
                    attrs.insert("list_type".to_string(), Value::from(list_type.as_str()));
                    let list = self.create_element_with(LIST_KIND, attrs)?;
                    self.insert_before(block, list)?;
                    list
                }
            };
            self.append(list, item)?;
            self.remove(block)?;
            open = Some(list);
        }
        Ok(())
    }

    pub fn remove_list(&mut self) -> Result<(), EditorError> {
        let mut lists: Vec<NodeKey> = Vec::new();
        for block in self.selected_blocks() {
            if self.kind_of(block) != LIST_ITEM_KIND {
                continue;
            }
            if let Some(top) = self.table.top_level(block) {
                if self.kind_of(top) == LIST_KIND && !lists.contains(&top) {
                    lists.push(top);
                }
            }
        }
        for list in lists {
            let items: Vec<NodeKey> = self
                .table
                .subtree(list)
                .into_iter()
                .filter(|k| self.kind_of(*k) == LIST_ITEM_KIND)
                .collect();
            let mut cursor = list;
            for item in items {
                let paragraph = self.create_element_with(PARAGRAPH_KIND, self.carried_attrs(item))?;
                for child in self.table.children(item).to_vec() {
                    if self.kind_of(child) != LIST_KIND {
                        self.append(paragraph, child)?;
                    }
                }
                self.insert_after(cursor, paragraph)?;
                cursor = paragraph;
            }
            self.remove(list)?;
        }
        Ok(())
    }

    /// Inserts a rule after the caret's top-level block, followed by an
    /// empty paragraph that receives the caret.
    pub fn insert_horizontal_rule(&mut self) -> Result<(), EditorError> {
        let anchor = self.selection.anchor;
        let root = self.root();
        let top = self
            .point_block(&anchor)
            .and_then(|block| self.table.top_level(block))
            .or_else(|| self.table.top_level(anchor.key));

        let rule = self.create_element(HORIZONTAL_RULE_KIND)?;
        match top {
            Some(top) => self.insert_after(top, rule)?,
            None => {
                let index = anchor.offset.min(self.table.children(root).len());
                self.attach(root, rule, index)?;
            }
        }
        let paragraph = self.create_element(PARAGRAPH_KIND)?;
        let text = self.create_text("")?;
        self.append(paragraph, text)?;
        self.insert_after(rule, paragraph)?;
        self.select_collapsed(Point::text(text, 0));
        Ok(())
    }

    /// Types `text` at the caret, replacing a range selection first. Text
    /// whose caret format differs from the surrounding node gets its own
    /// node.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        if !self.selection.is_collapsed() {
            self.delete_selected()?;
        }
        let format = self.selection.format;
        let style = self.selection.style.clone();
        let inserted = text.chars().count();

        let mut point = self.selection.anchor;
        if !self.table.get(point.key).is_some_and(Node::is_text)
            && !self.is_text_block_key(point.key)
        {
            if let Some(resolved) = self.table.text_point(&point) {
                point = resolved;
            }
        }

        let node = self
            .table
            .get(point.key)
            .ok_or(StructureError::UnknownNode(point.key))?;
        if let Some(existing) = node.as_text() {
            let key = point.key;
            let len = existing.text.chars().count();
            if existing.text.is_empty() || (existing.format == format && existing.style == style) {
                if existing.text.is_empty() {
                    self.set_format(key, format)?;
                    self.set_style(key, style)?;
                }
                self.splice_text(key, point.offset, 0, text)?;
                self.select_collapsed(Point::text(key, point.offset.min(len) + inserted));
                return Ok(());
            }
            let new = self.create_node(NodeData::Text(TextData {
                text: text.to_string(),
                format,
                style,
            }))?;
            if point.offset == 0 {
                self.insert_before(key, new)?;
            } else {
                if point.offset < len {
                    self.split_text(key, point.offset)?;
                }
                self.insert_after(key, new)?;
            }
            self.select_collapsed(Point::text(new, inserted));
            return Ok(());
        }

        let new = self.create_node(NodeData::Text(TextData {
            text: text.to_string(),
            format,
            style,
        }))?;
        let container = point.key;
        let index = point.offset.min(self.table.children(container).len());
        if self.is_text_block_key(container) {
            self.attach(container, new, index)?;
        } else {
            let kind = if self.registry().can_contain(self.kind_of(container), PARAGRAPH_KIND) {
                PARAGRAPH_KIND
            } else {
                LIST_ITEM_KIND
            };
            let block = self.create_element(kind)?;
            self.append(block, new)?;
            self.attach(container, block, index)?;
        }
        self.select_collapsed(Point::text(new, inserted));
        Ok(())
    }

    pub fn delete_selected(&mut self) -> Result<(), EditorError> {
        if self.selection.is_collapsed() {
            return Ok(());
        }
        let (start, end) = self.selection.ordered(&self.table);
        let (Some(start), Some(end)) = (self.table.text_point(&start), self.table.text_point(&end))
        else {
            self.select_collapsed(start);
            return Ok(());
        };

        if start.key == end.key {
            self.splice_text(start.key, start.offset, end.offset.saturating_sub(start.offset), "")?;
            self.select_collapsed(start);
            return Ok(());
        }

        let start_block = self.block_of(start.key);
        let end_block = self.block_of(end.key);

        let texts = self.table.text_nodes();
        let (Some(si), Some(ei)) = (
            texts.iter().position(|k| *k == start.key),
            texts.iter().position(|k| *k == end.key),
        ) else {
            return Ok(());
        };
        for key in &texts[si + 1..ei] {
            self.remove(*key)?;
        }
        let start_len = self.table.get(start.key).map(Node::size).unwrap_or(0);
        self.splice_text(start.key, start.offset, start_len, "")?;
        self.splice_text(end.key, 0, end.offset, "")?;

        if let (Some(start_block), Some(end_block)) = (start_block, end_block) {
            if start_block != end_block {
                let leaves = self.leaf_blocks();
                let from = leaves.iter().position(|k| *k == start_block);
                let to = leaves.iter().position(|k| *k == end_block);
                if let (Some(from), Some(to)) = (from, to)
                    && from < to
                {
                    for key in leaves[from + 1..to].to_vec() {
                        if self.table.contains(key) && !self.table.is_ancestor_or_self(key, end_block)
                        {
                            self.remove_and_prune(key)?;
                        }
                    }
                }
                let mut cursor = start.key;
                for child in self.table.children(end_block).to_vec() {
                    if self.kind_of(child) == LIST_KIND {
                        continue;
                    }
                    self.insert_after(cursor, child)?;
                    cursor = child;
                }
                self.remove_and_prune(end_block)?;
            }
        }
        self.select_collapsed(start);
        Ok(())
    }

    /// Backspace (`backward`) or forward delete at a collapsed caret.
    pub fn delete_character(&mut self, backward: bool) -> Result<(), EditorError> {
        if !self.selection.is_collapsed() {
            return self.delete_selected();
        }
        let Some(point) = self.table.text_point(&self.selection.anchor) else {
            return Ok(());
        };
        let key = point.key;
        let len = self.table.get(key).map(Node::size).unwrap_or(0);

        if backward && point.offset > 0 {
            self.splice_text(key, point.offset - 1, 1, "")?;
            self.select_collapsed(Point::text(key, point.offset - 1));
            return Ok(());
        }
        if !backward && point.offset < len {
            self.splice_text(key, point.offset, 1, "")?;
            self.select_collapsed(point);
            return Ok(());
        }

        let sibling = if backward {
            self.table.previous_sibling(key)
        } else {
            self.table.next_sibling(key)
        };
        if let Some(sibling) = sibling.filter(|k| self.table.get(*k).is_some_and(Node::is_text)) {
            let sibling_len = self.table.get(sibling).map(Node::size).unwrap_or(0);
            if sibling_len == 0 {
                self.remove(sibling)?;
            } else if backward {
                self.splice_text(sibling, sibling_len - 1, 1, "")?;
            } else {
                self.splice_text(sibling, 0, 1, "")?;
            }
            self.select_collapsed(point);
            return Ok(());
        }

        let Some(block) = self.block_of(key) else {
            return Ok(());
        };
        if backward && self.kind_of(block) == LIST_ITEM_KIND {
            self.lift_list_item(block)?;
            self.select_collapsed(point);
            return Ok(());
        }

        let leaves = self.leaf_blocks();
        let Some(ix) = leaves.iter().position(|k| *k == block) else {
            return Ok(());
        };
        let neighbour = if backward {
            ix.checked_sub(1).and_then(|ix| leaves.get(ix))
        } else {
            leaves.get(ix + 1)
        };
        let Some(&neighbour) = neighbour else {
            return Ok(());
        };
        if self.registry().is_void(self.kind_of(neighbour)) {
            self.remove(neighbour)?;
            self.select_collapsed(point);
            return Ok(());
        }
        if backward {
            self.merge_blocks(neighbour, block)
        } else {
            self.merge_blocks(block, neighbour)
        }
    }

    /// Moves `from`'s inline content to the end of `into` and drops `from`.
    /// The caret lands at the join.
    fn merge_blocks(&mut self, into: NodeKey, from: NodeKey) -> Result<(), EditorError> {
        let last_text = self
            .table
            .children(into)
            .iter()
            .rev()
            .find(|k| self.table.get(**k).is_some_and(Node::is_text))
            .copied();
        let caret = match last_text {
            Some(text) => Point::text(text, self.table.get(text).map(Node::size).unwrap_or(0)),
            None => Point::element(into, self.table.children(into).len()),
        };
        for child in self.table.children(from).to_vec() {
            if self.kind_of(child) != LIST_KIND {
                self.append(into, child)?;
            }
        }
        self.remove_and_prune(from)?;
        self.select_collapsed(caret);
        Ok(())
    }

    /// Splits the caret's block in two. An empty list item leaves its list
    /// instead.
    pub fn insert_paragraph(&mut self) -> Result<(), EditorError> {
        if !self.selection.is_collapsed() {
            self.delete_selected()?;
        }
        let anchor = self.selection.anchor;
        let point = self.table.text_point(&anchor);
        let block = match point {
            Some(point) => self.block_of(point.key),
            None => self.block_of(anchor.key),
        };

        let Some(block) = block else {
            let paragraph = self.create_element(PARAGRAPH_KIND)?;
            let text = self.create_text("")?;
            self.append(paragraph, text)?;
            let container = if self.registry().can_contain(self.kind_of(anchor.key), PARAGRAPH_KIND) {
                anchor.key
            } else {
                self.root()
            };
            let index = anchor.offset.min(self.table.children(container).len());
            self.attach(container, paragraph, index)?;
            self.select_collapsed(Point::text(text, 0));
            return Ok(());
        };

        let kind = self.kind_of(block).to_string();
        if kind == LIST_ITEM_KIND && self.table.text_content(block).is_empty() {
            let paragraph = self.lift_list_item(block)?;
            self.select_start(paragraph);
            return Ok(());
        }

        let at_end = match point {
            Some(point) => {
                point.offset == self.table.get(point.key).map(Node::size).unwrap_or(0)
                    && self.table.next_sibling(point.key).is_none()
            }
            None => true,
        };
        let mut attrs = self.carried_attrs(block);
        let new_kind = match kind.as_str() {
            LIST_ITEM_KIND => {
                if self.table.get(block).and_then(|n| n.attr("checked")).is_some() {
                    attrs.insert("checked".to_string(), Value::Bool(false));
                }
                LIST_ITEM_KIND
            }
            HEADING_KIND if !at_end => {
                if let Some(level) = self.table.get(block).and_then(|n| n.attr("level")).cloned() {
                    attrs.insert("level".to_string(), level);
                }
                HEADING_KIND
            }
            _ => PARAGRAPH_KIND,
        };
        let new_block = self.create_element_with(new_kind, attrs)?;

        if let Some(point) = point.filter(|p| self.table.parent(p.key) == Some(block)) {
            let len = self.table.get(point.key).map(Node::size).unwrap_or(0);
            let first_moved = if point.offset == 0 {
                Some(point.key)
            } else if point.offset < len {
                Some(self.split_text(point.key, point.offset)?)
            } else {
                self.table.next_sibling(point.key)
            };
            if let Some(first) = first_moved {
                let children = self.table.children(block).to_vec();
                let from = children.iter().position(|k| *k == first).unwrap_or(children.len());
                for child in &children[from..] {
                    if self.kind_of(*child) != LIST_KIND {
                        self.append(new_block, *child)?;
                    }
                }
            }
        }

        self.insert_after(block, new_block)?;
        if self.table.first_text(new_block).is_none() {
            let text = self.create_text("")?;
            self.attach(new_block, text, 0)?;
        }
        self.select_start(new_block);
        Ok(())
    }
}
