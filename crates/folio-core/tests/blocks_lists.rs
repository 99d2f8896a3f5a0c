use folio_core::commands::{
    DELETE_CHARACTER, INSERT_CHECK_LIST, INSERT_HORIZONTAL_RULE, INSERT_ORDERED_LIST,
    INSERT_PARAGRAPH, INSERT_TEXT, INSERT_UNORDERED_LIST, REMOVE_LIST, SET_BLOCK_TYPE,
};
use folio_core::{BlockType, DocumentSource, Editor, NodeKey, Point};

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

fn caret(editor: &mut Editor, point: Point) {
    editor
        .update(|e| {
            e.draft()?.select_collapsed(point);
            Ok(())
        })
        .unwrap();
}

fn html(editor: &Editor) -> String {
    editor.save().unwrap().html
}

#[test]
fn block_type_conversions() {
    let mut editor = editor_with("<p>title</p>");

    editor.dispatch(SET_BLOCK_TYPE, BlockType::Heading(2)).unwrap();
    assert_eq!(html(&editor), r#"<h2 class="folio-h2">title</h2>"#);

    editor.dispatch(SET_BLOCK_TYPE, BlockType::Quote).unwrap();
    assert_eq!(html(&editor), r#"<blockquote class="folio-quote">title</blockquote>"#);

    editor.dispatch(SET_BLOCK_TYPE, BlockType::Paragraph).unwrap();
    assert_eq!(html(&editor), r#"<p class="folio-paragraph">title</p>"#);
}

#[test]
fn heading_levels_are_clamped() {
    let mut editor = editor_with("<p>t</p>");
    editor.dispatch(SET_BLOCK_TYPE, BlockType::Heading(9)).unwrap();
    assert_eq!(html(&editor), r#"<h6 class="folio-h6">t</h6>"#);
}

#[test]
fn enter_splits_the_block_at_the_caret() {
    let mut editor = editor_with("<p>hello world</p>");
    let text = texts(&editor)[0];
    caret(&mut editor, Point::text(text, 5));

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();

    let state = editor.state();
    assert_eq!(state.text_content(), "hello\n world");
    let moved = texts(&editor)[1];
    assert_eq!(state.selection().anchor, Point::text(moved, 0));
}

#[test]
fn enter_at_the_end_of_a_heading_starts_a_paragraph() {
    let mut editor = editor_with("<h1>T</h1>");
    let text = texts(&editor)[0];
    caret(&mut editor, Point::text(text, 1));

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();
    editor.dispatch(INSERT_TEXT, "body".to_string()).unwrap();

    assert_eq!(
        html(&editor),
        r#"<h1 class="folio-h1">T</h1><p class="folio-paragraph">body</p>"#
    );
}

#[test]
fn backspace_at_block_start_merges_into_the_previous_block() {
    let mut editor = editor_with("<p>ab</p><p>cd</p>");
    let cd = texts(&editor)[1];
    caret(&mut editor, Point::text(cd, 0));

    editor.dispatch(DELETE_CHARACTER, true).unwrap();

    let state = editor.state();
    assert_eq!(state.text_content(), "abcd");
    assert_eq!(state.table().text_nodes().len(), 1);
    assert_eq!(state.selection().anchor.offset, 2);
}

#[test]
fn forward_delete_inside_text_removes_one_character() {
    let mut editor = editor_with("<p>abc</p>");
    let text = texts(&editor)[0];
    caret(&mut editor, Point::text(text, 1));

    editor.dispatch(DELETE_CHARACTER, false).unwrap();

    assert_eq!(editor.state().text_content(), "ac");
    assert_eq!(editor.state().selection().anchor, Point::text(text, 1));
}

#[test]
fn backspace_after_a_rule_removes_it() {
    let mut editor = editor_with("<p>a</p><hr><p>b</p>");
    let b = texts(&editor)[1];
    caret(&mut editor, Point::text(b, 0));

    editor.dispatch(DELETE_CHARACTER, true).unwrap();

    assert_eq!(
        html(&editor),
        r#"<p class="folio-paragraph">a</p><p class="folio-paragraph">b</p>"#
    );
}

#[test]
fn range_delete_joins_the_end_blocks() {
    let mut editor = editor_with("<p>one</p><p>two</p><p>three</p>");
    let [one, _, three] = texts(&editor)[..] else {
        panic!("expected three text nodes");
    };
    editor
        .update(|e| {
            e.draft()?
                .select(Point::text(one, 1), Point::text(three, 2));
            Ok(())
        })
        .unwrap();

    editor.dispatch(DELETE_CHARACTER, true).unwrap();

    assert_eq!(editor.state().text_content(), "oree");
    assert_eq!(editor.state().selection().anchor.offset, 1);
}

#[test]
fn horizontal_rule_is_followed_by_an_empty_paragraph() {
    let mut editor = editor_with("<p>a</p>");

    editor.dispatch(INSERT_HORIZONTAL_RULE, ()).unwrap();

    assert_eq!(
        html(&editor),
        r#"<p class="folio-paragraph">a</p><hr class="folio-hr"><p class="folio-paragraph"><br></p>"#
    );
    let last = *texts(&editor).last().unwrap();
    assert_eq!(editor.state().selection().anchor, Point::text(last, 0));
}

#[test]
fn selected_paragraphs_become_one_list() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    let [one, two] = texts(&editor)[..] else {
        panic!("expected two text nodes");
    };
    editor
        .update(|e| {
            e.draft()?.select(Point::text(one, 0), Point::text(two, 3));
            Ok(())
        })
        .unwrap();

    editor.dispatch(INSERT_UNORDERED_LIST, ()).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul">"#,
            r#"<li class="folio-listitem" value="1">one</li>"#,
            r#"<li class="folio-listitem" value="2">two</li>"#,
            "</ul>",
        )
    );
}

#[test]
fn check_lists_render_checkbox_state() {
    let mut editor = editor_with("<p>task</p>");

    editor.dispatch(INSERT_CHECK_LIST, ()).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul" data-list="check">"#,
            r#"<li class="folio-listitem folio-listitem-unchecked" value="1" role="checkbox" aria-checked="false">task</li>"#,
            "</ul>",
        )
    );
}

#[test]
fn list_commands_switch_the_type_of_an_existing_list() {
    let mut editor = editor_with("<ul><li>a</li><li>b</li></ul>");

    editor.dispatch(INSERT_ORDERED_LIST, ()).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ol class="folio-list-ol">"#,
            r#"<li class="folio-listitem" value="1">a</li>"#,
            r#"<li class="folio-listitem" value="2">b</li>"#,
            "</ol>",
        )
    );
}

#[test]
fn remove_list_unwraps_items_into_paragraphs() {
    let mut editor = editor_with("<ul><li>one</li><li>two</li></ul><p>after</p>");

    editor.dispatch(REMOVE_LIST, ()).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<p class="folio-paragraph">one</p>"#,
            r#"<p class="folio-paragraph">two</p>"#,
            r#"<p class="folio-paragraph">after</p>"#,
        )
    );
}

#[test]
fn enter_on_an_empty_item_leaves_the_list() {
    let mut editor = editor_with("<ul><li>one</li></ul>");
    let one = texts(&editor)[0];
    caret(&mut editor, Point::text(one, 3));

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();
    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul">"#,
            r#"<li class="folio-listitem" value="1">one</li>"#,
            r#"<li class="folio-listitem" value="2"><br></li>"#,
            "</ul>",
        )
    );

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();
    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul">"#,
            r#"<li class="folio-listitem" value="1">one</li>"#,
            "</ul>",
            r#"<p class="folio-paragraph"><br></p>"#,
        )
    );
}

#[test]
fn enter_in_a_check_list_starts_an_unchecked_item() {
    let mut editor = editor_with(
        r#"<ul data-list="check"><li role="checkbox" aria-checked="true">done</li></ul>"#,
    );
    let done = texts(&editor)[0];
    caret(&mut editor, Point::text(done, 4));

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();
    editor.dispatch(INSERT_TEXT, "next".to_string()).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul" data-list="check">"#,
            r#"<li class="folio-listitem folio-listitem-checked" value="1" role="checkbox" aria-checked="true">done</li>"#,
            r#"<li class="folio-listitem folio-listitem-unchecked" value="2" role="checkbox" aria-checked="false">next</li>"#,
            "</ul>",
        )
    );
}

#[test]
fn nested_lists_number_each_level() {
    let editor = editor_with("<ol><li>a<ol><li>b</li><li>c</li></ol></li><li>d</li></ol>");

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ol class="folio-list-ol">"#,
            r#"<li class="folio-listitem" value="1">a"#,
            r#"<ol class="folio-list-ol">"#,
            r#"<li class="folio-listitem" value="1">b</li>"#,
            r#"<li class="folio-listitem" value="2">c</li>"#,
            "</ol></li>",
            r#"<li class="folio-listitem" value="2">d</li>"#,
            "</ol>",
        )
    );
}

#[test]
fn backspace_at_the_start_of_an_item_lifts_it() {
    let mut editor = editor_with("<ul><li>one</li><li>two</li><li>three</li></ul>");
    let two = texts(&editor)[1];
    caret(&mut editor, Point::text(two, 0));

    editor.dispatch(DELETE_CHARACTER, true).unwrap();

    assert_eq!(
        html(&editor),
        concat!(
            r#"<ul class="folio-list-ul"><li class="folio-listitem" value="1">one</li></ul>"#,
            r#"<p class="folio-paragraph">two</p>"#,
            r#"<ul class="folio-list-ul"><li class="folio-listitem" value="1">three</li></ul>"#,
        )
    );
}
