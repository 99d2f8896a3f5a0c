use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use folio_core::commands::{FORMAT_TEXT, INSERT_TEXT};
use folio_core::{
    Command, CommandPriority, DocumentSource, Editor, EditorError, LOAD_TAG, UpdateOptions,
};

const PING: Command<u32> = Command::new("ping");

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_rich_text();
    editor
        .load(DocumentSource::Markup(html.to_string()))
        .unwrap();
    editor
}

fn count_commits(editor: &mut Editor) -> Rc<Cell<usize>> {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    editor.register_update_listener(move |_| {
        seen.set(seen.get() + 1);
        Ok(())
    });
    calls
}

#[test]
fn failed_update_leaves_state_untouched() {
    let mut editor = editor_with("<p>hello</p>");
    let before = editor.state();
    let calls = count_commits(&mut editor);

    let result: Result<(), EditorError> = editor.update(|e| {
        e.draft()?.insert_text(" world")?;
        Err(EditorError::ReadOnly)
    });

    assert!(result.is_err());
    assert_eq!(editor.state(), before);
    assert_eq!(calls.get(), 0);
    assert!(!editor.can_undo());
}

#[test]
fn nested_updates_commit_once() {
    let mut editor = Editor::with_rich_text();
    let calls = count_commits(&mut editor);

    editor
        .update(|e| {
            e.update(|e| e.draft()?.insert_text("a"))?;
            assert!(e.in_update());
            e.update(|e| e.draft()?.insert_text("b"))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(editor.state().text_content(), "ab");
    assert_eq!(editor.history().undo_depth(), 1);
}

#[test]
fn failed_nested_update_only_discards_its_own_edits() {
    let mut editor = Editor::with_rich_text();

    editor
        .update(|e| {
            e.draft()?.insert_text("keep")?;
            let inner: Result<(), EditorError> = e.update(|e| {
                e.draft()?.insert_text(" drop")?;
                Err(EditorError::ReadOnly)
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();

    assert_eq!(editor.state().text_content(), "keep");
}

#[test]
fn panicking_update_leaves_the_editor_usable() {
    let mut editor = Editor::with_rich_text();
    let before = editor.state();
    let calls = count_commits(&mut editor);

    let caught = panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), EditorError> = editor.update(|e| {
            e.draft()?.insert_text("lost")?;
            panic!("handler blew up");
        });
    }));
    assert!(caught.is_err());
    assert!(!editor.in_update());
    assert_eq!(editor.state(), before);

    assert!(editor.dispatch(INSERT_TEXT, "hi".to_string()).unwrap());
    assert_eq!(editor.state().text_content(), "hi");
    assert_eq!(calls.get(), 1);
}

#[test]
fn panicking_nested_update_rolls_back_to_its_savepoint() {
    let mut editor = Editor::with_rich_text();

    editor
        .update(|e| {
            e.draft()?.insert_text("keep")?;
            let caught = panic::catch_unwind(AssertUnwindSafe(|| {
                let _: Result<(), EditorError> = e.update(|e| {
                    e.draft()?.insert_text(" drop")?;
                    panic!("nested handler blew up");
                });
            }));
            assert!(caught.is_err());
            assert!(e.in_update());
            Ok(())
        })
        .unwrap();

    assert_eq!(editor.state().text_content(), "keep");
}

#[test]
fn writes_that_restore_the_same_content_do_not_commit() {
    let mut editor = editor_with("<p>same</p>");
    let before = editor.state();
    let paragraph = before.table().children(before.root())[0];
    let calls = count_commits(&mut editor);

    editor
        .update(|e| {
            let draft = e.draft()?;
            draft.set_attr(paragraph, "format", Some(serde_json::json!("center")))?;
            draft.set_attr(paragraph, "format", None)
        })
        .unwrap();

    assert_eq!(calls.get(), 0);
    assert!(!editor.history().can_undo());
    assert!(Arc::ptr_eq(&editor.state(), &before));
}

#[test]
fn listeners_see_tags_and_both_states() {
    let mut editor = Editor::with_rich_text();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    editor.register_update_listener(move |event| {
        sink.borrow_mut().push((
            event.has_tag(LOAD_TAG),
            event.has_tag("paste"),
            event.prev_state.text_content(),
            event.state.text_content(),
            event.tree_changed,
        ));
        Ok(())
    });

    editor
        .load(DocumentSource::Markup("<p>one</p>".to_string()))
        .unwrap();
    editor
        .update_with(UpdateOptions::new().tag("paste"), |e| {
            e.draft()?.insert_text("x")
        })
        .unwrap();

    let events = events.borrow();
    assert_eq!(
        *events,
        vec![
            (true, false, String::new(), "one".to_string(), true),
            (false, true, "one".to_string(), "xone".to_string(), true),
        ]
    );
}

#[test]
fn failing_listeners_do_not_stop_the_others() {
    let mut editor = Editor::with_rich_text();
    editor.register_update_listener(|_| anyhow::bail!("listener exploded"));
    editor.register_update_listener(|_| panic!("listener panicked"));
    let calls = count_commits(&mut editor);

    editor
        .update(|e| e.draft()?.insert_text("a"))
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(editor.state().text_content(), "a");
}

#[test]
fn unregistered_listeners_stop_receiving_events() {
    let mut editor = Editor::with_rich_text();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let id = editor.register_update_listener(move |_| {
        seen.set(seen.get() + 1);
        Ok(())
    });

    editor.update(|e| e.draft()?.insert_text("a")).unwrap();
    assert!(editor.unregister_update_listener(id));
    editor.update(|e| e.draft()?.insert_text("b")).unwrap();

    assert_eq!(calls.get(), 1);
    assert!(!editor.unregister_update_listener(id));
}

#[test]
fn commits_fold_into_one_pending_render() {
    let mut editor = Editor::with_rich_text();
    editor.take_render();

    editor.update(|e| e.draft()?.insert_text("a")).unwrap();
    editor.update(|e| e.draft()?.insert_text("b")).unwrap();

    let frame = editor.take_render().unwrap();
    assert_eq!(frame.commits, 2);
    assert_eq!(frame.state, editor.state());
    assert!(!frame.dirty.is_empty());
    assert!(editor.take_render().is_none());
}

#[test]
fn handlers_run_by_priority_then_registration_order() {
    let mut editor = Editor::with_rich_text();
    let log = Arc::new(Mutex::new(Vec::new()));

    for (name, priority, handled) in [
        ("low", CommandPriority::Low, true),
        ("normal-1", CommandPriority::Normal, false),
        ("high", CommandPriority::High, false),
        ("normal-2", CommandPriority::Normal, true),
    ] {
        let log = Arc::clone(&log);
        editor.register_command(PING, priority, move |_, payload| {
            log.lock().unwrap().push(format!("{name}:{payload}"));
            Ok(handled)
        });
    }

    assert!(editor.dispatch(PING, 7).unwrap());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["high:7", "normal-1:7", "normal-2:7"]
    );
}

#[test]
fn unhandled_and_unknown_commands_report_false() {
    let mut editor = Editor::with_rich_text();
    assert!(!editor.dispatch(PING, 1).unwrap());

    let id = editor.register_command(PING, CommandPriority::Normal, |_, _| Ok(false));
    assert!(editor.has_command("ping"));
    assert!(!editor.dispatch(PING, 1).unwrap());

    assert!(editor.unregister_command(id));
    assert!(!editor.has_command("ping"));
}

#[test]
fn host_handlers_can_preempt_built_in_ones() {
    let mut editor = Editor::with_rich_text();
    editor.register_command(INSERT_TEXT, CommandPriority::Normal, |_, text| {
        Ok(text == "blocked")
    });

    editor.dispatch(INSERT_TEXT, "blocked".to_string()).unwrap();
    assert_eq!(editor.state().text_content(), "");

    editor.dispatch(INSERT_TEXT, "typed".to_string()).unwrap();
    assert_eq!(editor.state().text_content(), "typed");
}

#[test]
fn a_failing_handler_rolls_back_the_whole_dispatch() {
    let mut editor = Editor::with_rich_text();
    let before = editor.state();
    editor.register_command(PING, CommandPriority::High, |editor, _| {
        editor.draft()?.insert_text("partial")?;
        Ok(false)
    });
    editor.register_command(PING, CommandPriority::Normal, |_, _| {
        Err(EditorError::ReadOnly)
    });

    assert!(editor.dispatch(PING, 0).is_err());
    assert_eq!(editor.state(), before);
}

#[test]
fn read_only_editors_refuse_commands() {
    let mut editor = Editor::with_rich_text();
    editor.set_editable(false);

    let err = editor.dispatch(INSERT_TEXT, "x".to_string()).unwrap_err();
    assert!(matches!(err, EditorError::ReadOnly));

    editor.set_editable(true);
    assert!(editor.dispatch(INSERT_TEXT, "x".to_string()).unwrap());
}

#[test]
fn malformed_payloads_are_rejected_before_the_handler() {
    let mut editor = Editor::with_rich_text();
    let err = editor
        .dispatch_command(FORMAT_TEXT.name(), serde_json::json!("sparkly"))
        .unwrap_err();
    let EditorError::InvalidPayload { command, .. } = err else {
        panic!("expected an invalid payload error, got {err:?}");
    };
    assert_eq!(command, "format_text");
}
