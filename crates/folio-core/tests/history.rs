use folio_core::commands::{CLEAR_HISTORY, INSERT_TEXT, REDO, SET_BLOCK_TYPE, UNDO};
use folio_core::{
    BlockType, DocumentSource, Editor, EditorConfig, ExtensionRegistry, Point, UpdateOptions,
};

fn type_text(editor: &mut Editor, text: &str) {
    editor.dispatch(INSERT_TEXT, text.to_string()).unwrap();
}

#[test]
fn undo_and_redo_restore_exact_snapshots() {
    let mut editor = Editor::with_rich_text();
    let initial = editor.state();

    type_text(&mut editor, "a");
    let typed = editor.state();

    assert!(editor.undo().unwrap());
    assert_eq!(*editor.state(), *initial);
    assert!(editor.can_redo());

    assert!(editor.redo().unwrap());
    assert_eq!(*editor.state(), *typed);
    assert!(!editor.can_redo());
}

#[test]
fn consecutive_typing_is_one_undo_step() {
    let mut editor = Editor::with_rich_text();
    type_text(&mut editor, "a");
    type_text(&mut editor, "b");
    type_text(&mut editor, "c");

    assert_eq!(editor.state().text_content(), "abc");
    assert_eq!(editor.history().undo_depth(), 1);

    editor.undo().unwrap();
    assert_eq!(editor.state().text_content(), "");
}

#[test]
fn moving_the_caret_breaks_typing_merges() {
    let mut editor = Editor::with_rich_text();
    type_text(&mut editor, "a");
    let text = editor.state().table().text_nodes()[0];

    editor
        .update(|e| {
            e.draft()?.select_collapsed(Point::text(text, 0));
            Ok(())
        })
        .unwrap();
    type_text(&mut editor, "b");

    assert_eq!(editor.state().text_content(), "ba");
    assert_eq!(editor.history().undo_depth(), 2);

    editor.undo().unwrap();
    assert_eq!(editor.state().text_content(), "a");
}

#[test]
fn explicit_merge_tags_collapse_updates() {
    let mut editor = Editor::with_rich_text();
    for word in ["one", " two"] {
        editor
            .update_with(UpdateOptions::new().merge_tag("bulk"), |e| {
                e.draft()?.insert_text(word)
            })
            .unwrap();
    }
    editor
        .update_with(UpdateOptions::new().merge_tag("other"), |e| {
            e.draft()?.insert_text("!")
        })
        .unwrap();

    assert_eq!(editor.history().undo_depth(), 2);
    editor.undo().unwrap();
    assert_eq!(editor.state().text_content(), "one two");
    editor.undo().unwrap();
    assert_eq!(editor.state().text_content(), "");
}

#[test]
fn new_edits_clear_redo() {
    let mut editor = Editor::with_rich_text();
    type_text(&mut editor, "a");
    editor.undo().unwrap();
    assert!(editor.can_redo());

    type_text(&mut editor, "b");
    assert!(!editor.can_redo());
    assert!(!editor.redo().unwrap());
}

#[test]
fn history_depth_is_capped() {
    let config = EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(ExtensionRegistry::rich_text(), config);

    for block_type in [BlockType::Heading(1), BlockType::Quote, BlockType::Heading(2)] {
        editor.dispatch(SET_BLOCK_TYPE, block_type).unwrap();
    }

    assert_eq!(editor.history().undo_depth(), 2);
    editor.undo().unwrap();
    editor.undo().unwrap();
    assert!(!editor.can_undo());

    let state = editor.state();
    let block = state.table().children(state.root())[0];
    assert_eq!(state.get(block).and_then(|n| n.heading_level()), Some(1));
}

#[test]
fn skipped_updates_are_not_recorded() {
    let mut editor = Editor::with_rich_text();
    editor
        .update_with(UpdateOptions::new().skip_history(true), |e| {
            e.draft()?.insert_text("quiet")
        })
        .unwrap();
    assert!(!editor.can_undo());
}

#[test]
fn loading_a_document_starts_history_afresh() {
    let mut editor = Editor::with_rich_text();
    type_text(&mut editor, "draft");
    assert!(editor.can_undo());

    editor
        .load(DocumentSource::Markup("<p>loaded</p>".to_string()))
        .unwrap();

    assert!(!editor.can_undo());
    assert!(!editor.undo().unwrap());
    assert_eq!(editor.state().text_content(), "loaded");
}

#[test]
fn history_commands_drive_the_stacks() {
    let mut editor = Editor::with_rich_text();
    type_text(&mut editor, "a");

    assert!(editor.dispatch(UNDO, ()).unwrap());
    assert_eq!(editor.state().text_content(), "");
    assert!(editor.dispatch(REDO, ()).unwrap());
    assert_eq!(editor.state().text_content(), "a");

    editor.dispatch(CLEAR_HISTORY, ()).unwrap();
    assert!(!editor.can_undo());
    assert!(!editor.can_redo());
    assert_eq!(editor.state().text_content(), "a");
}

#[test]
fn undo_notifies_listeners_with_the_historic_tag() {
    let mut editor = Editor::with_rich_text();
    let tags = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&tags);
    editor.register_update_listener(move |event| {
        sink.borrow_mut()
            .push((event.has_tag(folio_core::HISTORIC_TAG), event.can_undo, event.can_redo));
        Ok(())
    });

    type_text(&mut editor, "a");
    editor.undo().unwrap();

    assert_eq!(*tags.borrow(), vec![(false, true, false), (true, false, true)]);
}
