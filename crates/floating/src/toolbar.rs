use folio_core::commands::{FORMAT_TEXT, PATCH_TEXT_STYLE};
use folio_core::style::{BACKGROUND_COLOR, COLOR};
use folio_core::{
    Editor, EditorError, EditorState, HEADING_KIND, LIST_KIND, ListType, Node, PARAGRAPH_KIND,
    QUOTE_KIND, StylePatch, TEXT_KIND, TextFormatType,
};
use serde::Serialize;
use tracing::trace;

use crate::config::FloatingConfig;
use crate::geometry::{Bounds, Size};
use crate::options::{BlockCategory, BlockOption};
use crate::surface::LayoutSurface;

/// Formats the toolbar's toggle group controls.
pub const TOGGLE_FORMATS: [TextFormatType; 4] = [
    TextFormatType::Bold,
    TextFormatType::Italic,
    TextFormatType::Underline,
    TextFormatType::Strikethrough,
];

const BLOCK_MENU_CATEGORIES: [BlockCategory; 4] = [
    BlockCategory::Basic,
    BlockCategory::Headings,
    BlockCategory::Lists,
    BlockCategory::Quotes,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Above,
    Below,
}

/// Toolbar origin relative to the anchor element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolbarPosition {
    pub top: f32,
    pub left: f32,
    pub placement: Placement,
}

/// Places a toolbar of `toolbar` size over `target`.
///
/// It sits above the target unless that would cross the top of `scroller`,
/// then below. Horizontally it follows the target's leading edge, or its
/// trailing edge for end-aligned text, and is kept inside `scroller`.
pub fn compute_toolbar_position(
    target: Bounds,
    toolbar: Size,
    anchor: Bounds,
    scroller: Bounds,
    align_end: bool,
    config: &FloatingConfig,
) -> ToolbarPosition {
    let gap = config.vertical_gap;
    let offset = config.horizontal_offset;

    let mut top = target.top() - toolbar.height - gap;
    let mut left = if align_end {
        target.right() - toolbar.width + offset
    } else {
        target.left() - offset
    };

    let mut placement = Placement::Above;
    if top < scroller.top() {
        top += toolbar.height + target.height() + gap * 2.;
        placement = Placement::Below;
    }
    if left + toolbar.width > scroller.right() {
        left = scroller.right() - toolbar.width - offset;
    }
    if left < scroller.left() {
        left = scroller.left() + offset;
    }

    ToolbarPosition {
        top: top - anchor.top(),
        left: left - anchor.left(),
        placement,
    }
}

/// Rectangle of the current selection. A selection on the root itself has
/// no range box, so the first leaf under the root stands in for it.
pub fn selection_rect(state: &EditorState, surface: &dyn LayoutSurface) -> Option<Bounds> {
    let anchor = state.selection().anchor;
    if anchor.key != state.root() {
        return surface.range_rect();
    }
    let table = state.table();
    let mut path = vec![state.root()];
    while let Some(first) = path.last().and_then(|k| table.children(*k).first()) {
        path.push(*first);
    }
    path.iter().rev().find_map(|key| surface.node_rect(*key))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading(u8),
    OrderedList,
    UnorderedList,
    CheckList,
    Quote,
    Other(String),
}

impl BlockKind {
    /// Matches the id of the block option that produces this kind.
    pub fn as_key(&self) -> String {
        match self {
            BlockKind::Paragraph => "paragraph".to_string(),
            BlockKind::Heading(level) => format!("heading-{level}"),
            BlockKind::OrderedList => "ordered-list".to_string(),
            BlockKind::UnorderedList => "unordered-list".to_string(),
            BlockKind::CheckList => "check-list".to_string(),
            BlockKind::Quote => "quote".to_string(),
            BlockKind::Other(kind) => kind.clone(),
        }
    }

    fn from_list(node: &Node) -> Self {
        match node.list_type() {
            Some(ListType::Number) => BlockKind::OrderedList,
            Some(ListType::Check) => BlockKind::CheckList,
            _ => BlockKind::UnorderedList,
        }
    }
}

/// What the toolbar shows as active for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ToolbarState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub capitalize: bool,
    pub block_kind: BlockKind,
    /// `""` when the selection mixes colors.
    pub font_color: String,
    pub background_color: String,
}

impl ToolbarState {
    pub fn from_state(state: &EditorState) -> Self {
        let has = |ty| state.selection_has_format(ty);
        Self {
            bold: has(TextFormatType::Bold),
            italic: has(TextFormatType::Italic),
            underline: has(TextFormatType::Underline),
            strikethrough: has(TextFormatType::Strikethrough),
            subscript: has(TextFormatType::Subscript),
            superscript: has(TextFormatType::Superscript),
            uppercase: has(TextFormatType::Uppercase),
            lowercase: has(TextFormatType::Lowercase),
            capitalize: has(TextFormatType::Capitalize),
            block_kind: block_kind(state),
            font_color: state.selection_style_value(COLOR, ""),
            background_color: state.selection_style_value(BACKGROUND_COLOR, ""),
        }
    }

    pub fn is_active(&self, ty: TextFormatType) -> bool {
        match ty {
            TextFormatType::Bold => self.bold,
            TextFormatType::Italic => self.italic,
            TextFormatType::Underline => self.underline,
            TextFormatType::Strikethrough => self.strikethrough,
            TextFormatType::Subscript => self.subscript,
            TextFormatType::Superscript => self.superscript,
            TextFormatType::Uppercase => self.uppercase,
            TextFormatType::Lowercase => self.lowercase,
            TextFormatType::Capitalize => self.capitalize,
            TextFormatType::Code | TextFormatType::Highlight => false,
        }
    }
}

/// Type of the block holding the selection anchor. Inside a list the
/// nearest list decides.
fn block_kind(state: &EditorState) -> BlockKind {
    let table = state.table();
    let anchor = state.selection().anchor.key;
    let Some(top) = table.top_level(anchor).and_then(|key| table.get(key)) else {
        return BlockKind::Paragraph;
    };
    match top.kind() {
        LIST_KIND => table
            .nearest(anchor, |node| node.kind() == LIST_KIND)
            .and_then(|key| table.get(key))
            .map_or_else(|| BlockKind::from_list(top), BlockKind::from_list),
        HEADING_KIND => BlockKind::Heading(top.heading_level().unwrap_or(1)),
        QUOTE_KIND => BlockKind::Quote,
        PARAGRAPH_KIND => BlockKind::Paragraph,
        other => BlockKind::Other(other.to_string()),
    }
}

/// Whether the selection block is end-aligned.
fn selection_aligned_end(state: &EditorState) -> bool {
    let table = state.table();
    table
        .nearest(state.selection().anchor.key, |node| !node.is_text())
        .and_then(|key| table.get(key))
        .and_then(Node::element_format)
        .is_some_and(|format| format.is_trailing())
}

/// The block menu's subset of the picker options.
pub fn block_menu_options(options: &[BlockOption]) -> Vec<&BlockOption> {
    options
        .iter()
        .filter(|option| BLOCK_MENU_CATEGORIES.contains(&option.category))
        .collect()
}

pub struct FloatingToolbar {
    config: FloatingConfig,
    size: Size,
    pointer_down: bool,
    visible: bool,
    state: ToolbarState,
    position: Option<ToolbarPosition>,
}

impl FloatingToolbar {
    pub fn new(config: FloatingConfig) -> Self {
        Self {
            config,
            size: Size::default(),
            pointer_down: false,
            visible: false,
            state: ToolbarState::default(),
            position: None,
        }
    }

    /// Records the toolbar's rendered size.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn state(&self) -> &ToolbarState {
        &self.state
    }

    pub fn position(&self) -> Option<ToolbarPosition> {
        self.position
    }

    /// Hides the toolbar while a drag-select is in progress.
    pub fn pointer_down(&mut self) {
        self.pointer_down = true;
        self.visible = false;
    }

    pub fn pointer_up(&mut self, editor: &Editor, surface: &dyn LayoutSurface) {
        self.pointer_down = false;
        self.refresh(editor, surface);
    }

    /// Recomputes state, visibility and position. Call after every commit
    /// and on resize or scroll.
    pub fn refresh(&mut self, editor: &Editor, surface: &dyn LayoutSurface) {
        let state = editor.state();
        self.state = ToolbarState::from_state(&state);
        self.visible = self.should_show(&state, editor.is_editable(), surface);
        self.position = if self.visible {
            selection_rect(&state, surface).map(|target| {
                compute_toolbar_position(
                    target,
                    self.size,
                    surface.anchor_rect(),
                    surface.scroller_rect(),
                    selection_aligned_end(&state),
                    &self.config,
                )
            })
        } else {
            None
        };
        if self.position.is_none() {
            self.visible = false;
        }
        trace!(visible = self.visible, "toolbar refreshed");
    }

    fn should_show(&self, state: &EditorState, editable: bool, surface: &dyn LayoutSurface) -> bool {
        if self.pointer_down || !editable || !self.config.show_toolbar {
            return false;
        }
        if state.selection().is_collapsed() || !surface.selection_in_surface() {
            return false;
        }
        let target = state.selected_node();
        let kind = state.table().kind(target);
        if !matches!(kind, Some(TEXT_KIND | PARAGRAPH_KIND)) {
            return false;
        }
        !state.selection_text().replace('\n', "").is_empty()
    }

    /// Dispatches a toggle for each group format whose state differs from
    /// `active`. Returns how many were toggled.
    pub fn toggle_formats(
        &self,
        editor: &mut Editor,
        active: &[TextFormatType],
    ) -> Result<usize, EditorError> {
        let state = editor.state();
        let mut toggled = 0;
        for ty in TOGGLE_FORMATS {
            if active.contains(&ty) != state.selection_has_format(ty) {
                editor.dispatch(FORMAT_TEXT, ty)?;
                toggled += 1;
            }
        }
        Ok(toggled)
    }

    /// `None` clears the color.
    pub fn apply_text_color(
        &self,
        editor: &mut Editor,
        color: Option<&str>,
    ) -> Result<bool, EditorError> {
        editor.dispatch(PATCH_TEXT_STYLE, StylePatch::new().color(color))
    }

    pub fn apply_background_color(
        &self,
        editor: &mut Editor,
        color: Option<&str>,
    ) -> Result<bool, EditorError> {
        editor.dispatch(PATCH_TEXT_STYLE, StylePatch::new().background_color(color))
    }

    /// Runs a block menu option, then collapses the selection to its
    /// anchor.
    pub fn select_block_option(
        &self,
        editor: &mut Editor,
        option: &BlockOption,
    ) -> Result<(), EditorError> {
        editor.update(|editor| {
            option.insert(editor, "")?;
            let draft = editor.draft()?;
            let anchor = draft.selection().anchor;
            draft.select_collapsed(anchor);
            Ok(())
        })
    }
}
