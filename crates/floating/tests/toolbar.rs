use folio_core::{DocumentSource, Editor, NodeKey, Point, TextFormatType};
use folio_floating::colors::{TEXT_COLORS, active_color};
use folio_floating::geometry::{Bounds, Size};
use folio_floating::{
    BlockKind, FloatingConfig, FloatingToolbar, Placement, RecordedLayout, ToolbarState,
    base_options, block_menu_options, compute_toolbar_position,
};

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_rich_text();
    editor
        .load(DocumentSource::Markup(html.to_string()))
        .unwrap();
    editor
}

fn texts(editor: &Editor) -> Vec<NodeKey> {
    editor.state().table().text_nodes()
}

fn select(editor: &mut Editor, anchor: Point, focus: Point) {
    editor
        .update(|e| {
            e.draft()?.select(anchor, focus);
            Ok(())
        })
        .unwrap();
}

fn layout() -> RecordedLayout {
    RecordedLayout::new(Bounds::new(0., 0., 800., 600.)).range(Bounds::new(100., 200., 80., 20.))
}

fn toolbar() -> FloatingToolbar {
    let mut toolbar = FloatingToolbar::new(FloatingConfig::default());
    toolbar.set_size(Size::new(200., 40.));
    toolbar
}

#[test]
fn toolbar_flips_below_when_above_leaves_the_scroller() {
    let config = FloatingConfig::default();
    let scroller = Bounds::new(0., 100., 800., 500.);
    let anchor = Bounds::new(0., 0., 800., 2000.);
    let toolbar = Size::new(200., 40.);

    let near_top = compute_toolbar_position(
        Bounds::new(100., 110., 100., 20.),
        toolbar,
        anchor,
        scroller,
        false,
        &config,
    );
    assert_eq!(near_top.placement, Placement::Below);
    assert_eq!(near_top.top, 140.);

    let roomy = compute_toolbar_position(
        Bounds::new(100., 300., 100., 20.),
        toolbar,
        anchor,
        scroller,
        false,
        &config,
    );
    assert_eq!(roomy.placement, Placement::Above);
    assert_eq!(roomy.top, 250.);
}

#[test]
fn toolbar_stays_inside_the_right_edge_and_is_anchor_relative() {
    let config = FloatingConfig::default();
    let scroller = Bounds::new(0., 0., 800., 600.);
    let anchor = Bounds::new(20., 50., 760., 1000.);

    let position = compute_toolbar_position(
        Bounds::new(700., 300., 50., 20.),
        Size::new(200., 40.),
        anchor,
        scroller,
        false,
        &config,
    );

    assert_eq!(position.left, 595. - 20.);
    assert_eq!(position.top, 250. - 50.);
}

#[test]
fn derived_state_reads_formats_block_and_colors() {
    let mut editor = editor_with(
        r#"<h2><b>bold</b> <span style="color: red;">red</span></h2><ol><li>item</li></ol><ul data-list="check"><li>todo</li></ul>"#,
    );
    let [bold, _space, red, item, todo] = texts(&editor)[..] else {
        panic!("expected five text nodes");
    };

    select(&mut editor, Point::text(bold, 0), Point::text(bold, 4));
    let state = ToolbarState::from_state(&editor.state());
    assert!(state.bold);
    assert!(!state.italic);
    assert_eq!(state.block_kind, BlockKind::Heading(2));
    assert_eq!(state.block_kind.as_key(), "heading-2");
    assert_eq!(state.font_color, "");

    select(&mut editor, Point::text(red, 0), Point::text(red, 3));
    assert_eq!(ToolbarState::from_state(&editor.state()).font_color, "red");

    select(&mut editor, Point::text(bold, 0), Point::text(red, 3));
    let state = ToolbarState::from_state(&editor.state());
    assert_eq!(state.font_color, "");
    assert!(!state.bold);

    select(&mut editor, Point::text(item, 1), Point::text(item, 1));
    assert_eq!(
        ToolbarState::from_state(&editor.state()).block_kind,
        BlockKind::OrderedList
    );

    select(&mut editor, Point::text(todo, 1), Point::text(todo, 1));
    assert_eq!(
        ToolbarState::from_state(&editor.state()).block_kind.as_key(),
        "check-list"
    );
}

#[test]
fn visible_only_for_a_settled_range_inside_the_surface() {
    let mut editor = editor_with("<p>hello world</p>");
    let text = texts(&editor)[0];
    let mut surface = layout();
    let mut toolbar = toolbar();

    select(&mut editor, Point::text(text, 0), Point::text(text, 5));
    toolbar.refresh(&editor, &surface);
    assert!(toolbar.is_visible());
    let position = toolbar.position().unwrap();
    assert_eq!(position.placement, Placement::Above);
    assert_eq!((position.left, position.top), (95., 150.));

    toolbar.pointer_down();
    assert!(!toolbar.is_visible());
    toolbar.pointer_up(&editor, &surface);
    assert!(toolbar.is_visible());

    surface.set_selection_outside(true);
    toolbar.refresh(&editor, &surface);
    assert!(!toolbar.is_visible());
    surface.set_selection_outside(false);

    select(&mut editor, Point::text(text, 3), Point::text(text, 3));
    toolbar.refresh(&editor, &surface);
    assert!(!toolbar.is_visible());
    assert_eq!(toolbar.position(), None);
}

#[test]
fn hidden_on_read_only_editors_and_without_a_range_box() {
    let mut editor = editor_with("<p>hello world</p>");
    let text = texts(&editor)[0];
    select(&mut editor, Point::text(text, 0), Point::text(text, 5));
    let mut toolbar = toolbar();

    let mut surface = layout();
    surface.set_range(None);
    toolbar.refresh(&editor, &surface);
    assert!(!toolbar.is_visible());

    editor.set_editable(false);
    toolbar.refresh(&editor, &layout());
    assert!(!toolbar.is_visible());
}

#[test]
fn end_aligned_blocks_anchor_the_toolbar_to_the_trailing_edge() {
    let mut editor = editor_with(r#"<p style="text-align: right;">hello world</p>"#);
    let text = texts(&editor)[0];
    select(&mut editor, Point::text(text, 0), Point::text(text, 5));
    let mut toolbar = toolbar();

    let surface =
        RecordedLayout::new(Bounds::new(0., 0., 800., 600.)).range(Bounds::new(500., 200., 80., 20.));
    toolbar.refresh(&editor, &surface);

    assert_eq!(toolbar.position().map(|p| p.left), Some(580. - 200. + 5.));
}

#[test]
fn toggle_group_only_flips_formats_that_differ() {
    let mut editor = editor_with("<p><i>hello</i></p>");
    let text = texts(&editor)[0];
    select(&mut editor, Point::text(text, 0), Point::text(text, 5));
    let toolbar = toolbar();

    let toggled = toolbar
        .toggle_formats(&mut editor, &[TextFormatType::Bold, TextFormatType::Italic])
        .unwrap();
    assert_eq!(toggled, 1);
    let state = editor.state();
    assert!(state.selection_has_format(TextFormatType::Bold));
    assert!(state.selection_has_format(TextFormatType::Italic));

    let toggled = toolbar.toggle_formats(&mut editor, &[]).unwrap();
    assert_eq!(toggled, 2);
    assert_eq!(
        editor.save().unwrap().html,
        r#"<p class="folio-paragraph">hello</p>"#
    );
}

#[test]
fn color_menus_patch_the_selection_style() {
    let mut editor = editor_with("<p>hello world</p>");
    let text = texts(&editor)[0];
    select(&mut editor, Point::text(text, 0), Point::text(text, 5));
    let toolbar = toolbar();

    let red = TEXT_COLORS[3];
    toolbar.apply_text_color(&mut editor, red.value).unwrap();
    let state = ToolbarState::from_state(&editor.state());
    assert_eq!(state.font_color, "#ef4444");
    assert_eq!(active_color(&TEXT_COLORS, &state.font_color), Some(&red));

    toolbar.apply_text_color(&mut editor, None).unwrap();
    let state = ToolbarState::from_state(&editor.state());
    assert_eq!(state.font_color, "");
    assert_eq!(
        active_color(&TEXT_COLORS, &state.font_color).map(|c| c.key),
        Some("default")
    );

    toolbar
        .apply_background_color(&mut editor, Some("rgba(59, 130, 246, 0.35)"))
        .unwrap();
    assert_eq!(
        ToolbarState::from_state(&editor.state()).background_color,
        "rgba(59, 130, 246, 0.35)"
    );
}

#[test]
fn block_menu_converts_and_collapses_the_selection() {
    let options = base_options();
    let menu = block_menu_options(&options);
    let ids: Vec<&str> = menu.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "paragraph",
            "heading-1",
            "heading-2",
            "heading-3",
            "ordered-list",
            "unordered-list",
            "check-list",
            "quote",
        ]
    );

    let mut editor = editor_with("<p>hello world</p>");
    let text = texts(&editor)[0];
    select(&mut editor, Point::text(text, 2), Point::text(text, 7));
    let quote = menu.iter().find(|o| o.id == "quote").unwrap();

    toolbar().select_block_option(&mut editor, quote).unwrap();

    let state = editor.state();
    assert!(state.selection().is_collapsed());
    assert_eq!(state.selection().anchor, Point::text(text, 2));
    assert_eq!(
        editor.save().unwrap().html,
        r#"<blockquote class="folio-quote">hello world</blockquote>"#
    );
}
