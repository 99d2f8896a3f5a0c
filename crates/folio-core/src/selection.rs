use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::node::{NodeKey, TextFormat};
use crate::state::NodeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Text,
    Element,
}

/// A caret position. `offset` counts characters for text points and
/// children for element points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointKind,
}

impl Point {
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
    /// Format applied to text typed at a collapsed caret.
    pub format: TextFormat,
    pub style: String,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            format: TextFormat::empty(),
            style: String::new(),
        }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self, table: &NodeTable) -> bool {
        table.compare_points(&self.anchor, &self.focus) == Ordering::Greater
    }

    pub fn ordered(&self, table: &NodeTable) -> (Point, Point) {
        if self.is_backward(table) {
            (self.focus, self.anchor)
        } else {
            (self.anchor, self.focus)
        }
    }
}

/// Remaps `selection`, captured against `previous`, onto `current`.
///
/// Points on live nodes get their offsets clamped. Points on removed nodes
/// fall back to a boundary of the nearest surviving ancestor: its start when
/// the removed branch sat before the ancestor's first surviving child, its end
/// otherwise. A point with no surviving ancestor lands on the root.
pub fn normalize(selection: &Selection, previous: &NodeTable, current: &NodeTable) -> Selection {
    let anchor = normalize_point(&selection.anchor, previous, current);
    let focus = normalize_point(&selection.focus, previous, current);
    Selection {
        anchor,
        focus,
        format: selection.format,
        style: selection.style.clone(),
    }
}

fn normalize_point(point: &Point, previous: &NodeTable, current: &NodeTable) -> Point {
    if let Some(node) = current.get(point.key) {
        let offset = point.offset.min(node.size());
        return if node.is_text() {
            Point::text(point.key, offset)
        } else {
            Point::element(point.key, offset)
        };
    }

    let mut removed = point.key;
    while let Some(parent) = previous.parent(removed) {
        if current.contains(parent) {
            let siblings = previous.children(parent);
            let removed_ix = siblings.iter().position(|k| *k == removed);
            let first_surviving = siblings
                .iter()
                .position(|k| current.parent(*k) == Some(parent));
            let offset = match (removed_ix, first_surviving) {
                (Some(removed_ix), Some(first)) if removed_ix > first => {
                    current.children(parent).len()
                }
                _ => 0,
            };
            return Point::element(parent, offset);
        }
        removed = parent;
    }

    Point::element(current.root(), 0)
}

pub fn is_at_node_end(point: &Point, table: &NodeTable) -> bool {
    table
        .get(point.key)
        .is_some_and(|node| point.offset == node.size())
}

/// Node a format or link operation should target for a range selection.
///
/// Same node on both ends wins outright. Otherwise the direction decides:
/// for a backward range the anchor's node is chosen when the focus sits at
/// its node's end, and for a forward range when the anchor does.
pub fn resolve_node_for_merge(selection: &Selection, table: &NodeTable) -> NodeKey {
    let anchor = selection.anchor;
    let focus = selection.focus;
    if anchor.key == focus.key {
        return anchor.key;
    }
    if selection.is_backward(table) {
        if is_at_node_end(&focus, table) {
            anchor.key
        } else {
            focus.key
        }
    } else if is_at_node_end(&anchor, table) {
        anchor.key
    } else {
        focus.key
    }
}
