use folio_core::{Editor, EditorError, EditorState, NodeKey, PARAGRAPH_KIND, Point as Caret};
use serde::Serialize;
use tracing::debug;

use crate::config::FloatingConfig;
use crate::geometry::{Bounds, Point};
use crate::picker::BlockPicker;
use crate::surface::LayoutSurface;

/// Thickness of the drop target line.
pub const TARGET_LINE_HEIGHT: f32 = 4.;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSide {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub block: NodeKey,
    pub side: DropSide,
}

/// Which edge of the picker sits at `top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerEdge {
    /// Picker opens downward from `top`.
    Top,
    /// Picker grows upward and ends at `top`.
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PickerPlacement {
    pub left: f32,
    pub top: f32,
    pub edge: PickerEdge,
}

/// Places the picker under `rect`, or above it when the viewport has less
/// than the picker's height left below and enough room above.
pub fn place_picker(rect: Bounds, viewport: Bounds, config: &FloatingConfig) -> PickerPlacement {
    let room_below = viewport.bottom() - rect.bottom();
    let show_above = room_below < config.picker_height && rect.top() > config.picker_height;
    if show_above {
        PickerPlacement {
            left: rect.left(),
            top: rect.top(),
            edge: PickerEdge::Bottom,
        }
    } else {
        PickerPlacement {
            left: rect.left(),
            top: rect.bottom() + config.picker_gap,
            edge: PickerEdge::Top,
        }
    }
}

/// Drop side for a pointer at `y` over a block.
pub fn drop_side(rect: Bounds, y: f32) -> DropSide {
    if y < rect.mid_y() {
        DropSide::Before
    } else {
        DropSide::After
    }
}

/// Final index of an item moved out of `from_ix` into the gap before
/// `gap_ix`, counted after the item has been taken out.
pub fn reorder_index_from_gap(from_ix: usize, gap_ix: usize, item_count: usize) -> usize {
    let mut to_ix = gap_ix;
    if to_ix > from_ix {
        to_ix = to_ix.saturating_sub(1);
    }
    to_ix.min(item_count.saturating_sub(1))
}

/// Hover handle, "add block" button and drag reordering for top-level
/// blocks.
pub struct BlockControl {
    config: FloatingConfig,
    hovered: Option<NodeKey>,
    handle: Option<Bounds>,
    dragging: Option<NodeKey>,
    drop_target: Option<DropTarget>,
    pending_picker: Option<NodeKey>,
    picker_placement: Option<PickerPlacement>,
}

impl BlockControl {
    pub fn new(config: FloatingConfig) -> Self {
        Self {
            config,
            hovered: None,
            handle: None,
            dragging: None,
            drop_target: None,
            pending_picker: None,
            picker_placement: None,
        }
    }

    pub fn hovered(&self) -> Option<NodeKey> {
        self.hovered
    }

    /// Rectangle of the hovered block relative to the anchor element.
    pub fn handle_rect(&self) -> Option<Bounds> {
        self.handle
    }

    pub fn dragging(&self) -> Option<NodeKey> {
        self.dragging
    }

    pub fn drop_target(&self) -> Option<DropTarget> {
        self.drop_target
    }

    pub fn picker_placement(&self) -> Option<PickerPlacement> {
        self.picker_placement
    }

    /// The top-level block under `point` with a laid out rectangle.
    fn block_at(
        &self,
        state: &EditorState,
        surface: &dyn LayoutSurface,
        point: Point,
    ) -> Option<(NodeKey, Bounds)> {
        let table = state.table();
        let hit = surface.hit_test(point).filter(|key| table.contains(*key))?;
        let block = table.top_level(hit)?;
        surface.node_rect(block).map(|rect| (block, rect))
    }

    /// Tracks the pointer over the surface. Returns the hovered block.
    pub fn hover(
        &mut self,
        state: &EditorState,
        surface: &dyn LayoutSurface,
        point: Point,
    ) -> Option<NodeKey> {
        if !self.config.show_block_handle {
            return None;
        }
        if self.pending_picker.is_some() {
            return self.hovered;
        }
        match self.block_at(state, surface, point) {
            Some((block, rect)) => {
                self.hovered = Some(block);
                self.handle = Some(rect.relative_to(surface.anchor_rect().origin));
            }
            None => {
                self.hovered = None;
                self.handle = None;
            }
        }
        self.hovered
    }

    /// Inserts an empty paragraph after the hovered block, puts the caret
    /// in it and opens `picker` for it. The picker is placed by
    /// [`BlockControl::layout_picker`] once the paragraph is laid out.
    pub fn add_block(
        &mut self,
        editor: &mut Editor,
        picker: &mut BlockPicker,
    ) -> Result<Option<NodeKey>, EditorError> {
        let Some(hovered) = self.hovered else {
            return Ok(None);
        };
        if !editor.state().table().is_attached(hovered) {
            self.hovered = None;
            self.handle = None;
            return Ok(None);
        }
        let paragraph = editor.update(|editor| {
            let draft = editor.draft()?;
            let paragraph = draft.create_element(PARAGRAPH_KIND)?;
            let text = draft.create_text("")?;
            draft.append(paragraph, text)?;
            draft.insert_after(hovered, paragraph)?;
            draft.select_collapsed(Caret::text(text, 0));
            Ok(paragraph)
        })?;
        debug!(after = %hovered, %paragraph, "block added");

        picker.open_for(paragraph);
        self.pending_picker = Some(paragraph);
        self.picker_placement = None;
        Ok(Some(paragraph))
    }

    /// Places the picker against the new paragraph's rectangle.
    pub fn layout_picker(&mut self, surface: &dyn LayoutSurface) -> Option<PickerPlacement> {
        let paragraph = self.pending_picker?;
        let rect = surface.node_rect(paragraph)?;
        let placement = place_picker(rect, surface.viewport(), &self.config);
        self.picker_placement = Some(placement);
        Some(placement)
    }

    /// Called once the picker closed on its own, after a commit or Escape.
    pub fn picker_closed(&mut self) {
        self.pending_picker = None;
        self.picker_placement = None;
    }

    /// A press outside both the handle and the picker.
    pub fn pointer_down_outside(&mut self, picker: &mut BlockPicker) {
        if self.pending_picker.is_some() {
            picker.pointer_down_outside();
            self.picker_closed();
        }
        self.hovered = None;
        self.handle = None;
    }

    /// Starts dragging the hovered block.
    pub fn start_drag(&mut self) -> Option<NodeKey> {
        self.dragging = self.hovered;
        self.drop_target = None;
        self.dragging
    }

    pub fn drag_over(
        &mut self,
        state: &EditorState,
        surface: &dyn LayoutSurface,
        point: Point,
    ) -> Option<DropTarget> {
        self.dragging?;
        self.drop_target = self
            .block_at(state, surface, point)
            .map(|(block, rect)| DropTarget {
                block,
                side: drop_side(rect, point.y),
            });
        self.drop_target
    }

    /// The line showing where the block will land, relative to the anchor
    /// element.
    pub fn target_line(&self, surface: &dyn LayoutSurface) -> Option<Bounds> {
        let target = self.drop_target?;
        let rect = surface.node_rect(target.block)?;
        let y = match target.side {
            DropSide::Before => rect.top(),
            DropSide::After => rect.bottom(),
        };
        let line = Bounds::new(
            rect.left(),
            y - TARGET_LINE_HEIGHT / 2.,
            rect.width(),
            TARGET_LINE_HEIGHT,
        );
        Some(line.relative_to(surface.anchor_rect().origin))
    }

    pub fn cancel_drag(&mut self) {
        self.dragging = None;
        self.drop_target = None;
    }

    /// Moves the dragged block to the drop target. Only the block's position
    /// changes. Returns false when it would land where it already is.
    pub fn drop(&mut self, editor: &mut Editor) -> Result<bool, EditorError> {
        let (Some(dragged), Some(target)) = (self.dragging.take(), self.drop_target.take())
        else {
            return Ok(false);
        };
        move_block(editor, dragged, target)
    }
}

/// Moves `dragged` next to `target.block`.
pub fn move_block(
    editor: &mut Editor,
    dragged: NodeKey,
    target: DropTarget,
) -> Result<bool, EditorError> {
    let state = editor.state();
    let table = state.table();
    let (Some(from_parent), Some(to_parent)) = (table.parent(dragged), table.parent(target.block))
    else {
        return Ok(false);
    };
    let (Some(from_ix), Some(target_ix)) = (
        table.index_in_parent(dragged),
        table.index_in_parent(target.block),
    ) else {
        return Ok(false);
    };
    let gap_ix = match target.side {
        DropSide::Before => target_ix,
        DropSide::After => target_ix + 1,
    };

    let to_ix = if from_parent == to_parent {
        let to_ix = reorder_index_from_gap(from_ix, gap_ix, table.children(to_parent).len());
        if to_ix == from_ix {
            return Ok(false);
        }
        to_ix
    } else {
        gap_ix
    };

    editor.update(|editor| editor.attach(to_parent, dragged, to_ix))?;
    debug!(block = %dragged, from = from_ix, to = to_ix, "block moved");
    Ok(true)
}
