use std::collections::HashMap;

use folio_core::NodeKey;

use crate::geometry::{Bounds, Point};

/// Geometry the host's rendered view reports back. Everything floating is
/// placed from these rectangles; nothing here reads the document.
pub trait LayoutSurface {
    /// Rendered rectangle of a node, if it is laid out.
    fn node_rect(&self, key: NodeKey) -> Option<Bounds>;

    /// Bounding rectangle of the native selection range.
    fn range_rect(&self) -> Option<Bounds>;

    /// The element floating layers are positioned in.
    fn anchor_rect(&self) -> Bounds;

    /// Visible part of the scroll container around the editor.
    fn scroller_rect(&self) -> Bounds;

    fn viewport(&self) -> Bounds;

    /// Innermost rendered node under `point`.
    fn hit_test(&self, point: Point) -> Option<NodeKey>;

    /// Whether the native selection sits inside the editable surface.
    fn selection_in_surface(&self) -> bool {
        true
    }
}

/// A [`LayoutSurface`] backed by rectangles recorded from a layout pass.
#[derive(Debug, Clone, Default)]
pub struct RecordedLayout {
    rects: HashMap<NodeKey, Bounds>,
    range: Option<Bounds>,
    anchor: Bounds,
    scroller: Bounds,
    viewport: Bounds,
    selection_outside: bool,
}

impl RecordedLayout {
    /// A layout where anchor, scroller and viewport all share `viewport`.
    pub fn new(viewport: Bounds) -> Self {
        Self {
            anchor: viewport,
            scroller: viewport,
            viewport,
            ..Self::default()
        }
    }

    pub fn anchor(mut self, anchor: Bounds) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn scroller(mut self, scroller: Bounds) -> Self {
        self.scroller = scroller;
        self
    }

    pub fn node(mut self, key: NodeKey, rect: Bounds) -> Self {
        self.rects.insert(key, rect);
        self
    }

    pub fn range(mut self, rect: Bounds) -> Self {
        self.range = Some(rect);
        self
    }

    pub fn set_node(&mut self, key: NodeKey, rect: Bounds) {
        self.rects.insert(key, rect);
    }

    pub fn set_range(&mut self, rect: Option<Bounds>) {
        self.range = rect;
    }

    pub fn set_selection_outside(&mut self, outside: bool) {
        self.selection_outside = outside;
    }
}

impl LayoutSurface for RecordedLayout {
    fn node_rect(&self, key: NodeKey) -> Option<Bounds> {
        self.rects.get(&key).copied()
    }

    fn range_rect(&self) -> Option<Bounds> {
        self.range
    }

    fn anchor_rect(&self) -> Bounds {
        self.anchor
    }

    fn scroller_rect(&self) -> Bounds {
        self.scroller
    }

    fn viewport(&self) -> Bounds {
        self.viewport
    }

    fn hit_test(&self, point: Point) -> Option<NodeKey> {
        self.rects
            .iter()
            .filter(|(_, rect)| rect.contains(point))
            .min_by(|(ka, a), (kb, b)| {
                let area_a = a.width() * a.height();
                let area_b = b.width() * b.height();
                area_a.total_cmp(&area_b).then(kb.cmp(ka))
            })
            .map(|(key, _)| *key)
    }

    fn selection_in_surface(&self) -> bool {
        !self.selection_outside
    }
}
