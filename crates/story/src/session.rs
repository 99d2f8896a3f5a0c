use anyhow::{Context as _, Result};
use folio_core::commands::{INSERT_PARAGRAPH, INSERT_TEXT};
use folio_core::{Editor, EditorState, NodeKey, Point as Caret, TextFormatType};
use folio_floating::colors::TEXT_COLORS;
use folio_floating::geometry::{Bounds, Point, Size};
use folio_floating::{FloatingConfig, FloatingLayer, LayoutSurface, RecordedLayout, base_options};
use tracing::info;

const ROW_HEIGHT: f32 = 28.;
const VIEWPORT: Bounds = Bounds::new(0., 0., 960., 720.);

/// Lays the top-level blocks out as full-width rows. The range box is the
/// row holding the selection anchor.
fn layout(state: &EditorState) -> RecordedLayout {
    let table = state.table();
    let mut layout = RecordedLayout::new(VIEWPORT);
    for (ix, block) in table.children(state.root()).iter().enumerate() {
        let rect = Bounds::new(24., ix as f32 * ROW_HEIGHT, 720., ROW_HEIGHT);
        layout.set_node(*block, rect);
    }
    let anchor = state.selection().anchor.key;
    let range = table.top_level(anchor).and_then(|block| layout.node_rect(block));
    layout.set_range(range);
    layout
}

fn sync(layer: &mut FloatingLayer, editor: &Editor) -> RecordedLayout {
    let surface = layout(&editor.state());
    layer.on_update(editor, &surface);
    surface
}

fn caret_at_end(editor: &mut Editor) -> Result<()> {
    let root = editor.state().root();
    editor.update(|editor| {
        editor.draft()?.select_end(root);
        Ok(())
    })?;
    Ok(())
}

fn select_block(editor: &mut Editor, block: NodeKey) -> Result<()> {
    let state = editor.state();
    let table = state.table();
    let (Some(first), Some(last)) = (table.first_text(block), table.last_text(block)) else {
        return Ok(());
    };
    let end = table.get(last).map_or(0, |node| node.size());
    editor.update(|editor| {
        editor
            .draft()?
            .select(Caret::text(first, 0), Caret::text(last, end));
        Ok(())
    })?;
    Ok(())
}

fn row_point(surface: &RecordedLayout, block: NodeKey, dy: f32) -> Option<Point> {
    surface
        .node_rect(block)
        .map(|rect| Point::new(rect.left() + 8., rect.top() + dy))
}

/// Drives the editor the way a user would: a slash command, the toolbar,
/// the block handle and a drag.
pub fn run(editor: &mut Editor, config: &FloatingConfig) -> Result<()> {
    let mut layer = FloatingLayer::new(base_options(), config.clone())
        .with_context(|| format!("max_query_len {} is too large", config.max_query_len))?;
    layer.toolbar.set_size(Size::new(280., 36.));
    editor.register_update_listener(|event| {
        tracing::debug!(
            dirty = event.dirty.len(),
            tags = ?event.tags,
            can_undo = event.can_undo,
            "committed"
        );
        Ok(())
    });

    caret_at_end(editor)?;
    editor.dispatch(INSERT_PARAGRAPH, ())?;
    editor.dispatch(INSERT_TEXT, "/quote".to_string())?;
    sync(&mut layer, editor);
    let picked = layer.picker.commit(editor)?;
    info!(option = ?picked, "slash command");
    editor.dispatch(INSERT_TEXT, "Typed through the block picker.".to_string())?;

    let state = editor.state();
    let quote = state
        .table()
        .top_level(state.selection().anchor.key)
        .context("caret left the document")?;
    select_block(editor, quote)?;
    sync(&mut layer, editor);
    if layer.toolbar.is_visible() {
        info!(position = ?layer.toolbar.position(), "toolbar shown");
        layer
            .toolbar
            .toggle_formats(editor, &[TextFormatType::Bold])?;
        layer.toolbar.apply_text_color(editor, TEXT_COLORS[7].value)?;
    }

    let state = editor.state();
    let surface = layout(&state);
    if let Some(first) = state.table().children(state.root()).first().copied() {
        let point = row_point(&surface, first, 8.).context("first block has no row")?;
        layer.block_control.hover(&state, &surface, point);
        if layer
            .block_control
            .add_block(editor, &mut layer.picker)?
            .is_some()
        {
            sync(&mut layer, editor);
            layer.picker.set_query("divider");
            let picked = layer.picker.commit(editor)?;
            info!(option = ?picked, "block handle");
            sync(&mut layer, editor);
        }
    }

    let state = editor.state();
    let surface = layout(&state);
    let blocks = state.table().children(state.root()).to_vec();
    if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
        let grab = row_point(&surface, *last, 8.).context("last block has no row")?;
        let over = row_point(&surface, *first, 2.).context("first block has no row")?;
        layer.block_control.hover(&state, &surface, grab);
        layer.block_control.start_drag();
        layer.block_control.drag_over(&state, &surface, over);
        let moved = layer.block_control.drop(editor)?;
        info!(moved, "drag to top");
    }

    editor.undo()?;
    editor.redo()?;
    Ok(())
}
