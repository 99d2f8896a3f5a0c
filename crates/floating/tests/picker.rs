use folio_core::commands::INSERT_TEXT;
use folio_core::{DocumentSource, Editor, Point};
use folio_floating::{
    BlockCategory, BlockOption, BlockPicker, FloatingConfig, FloatingLayer, PickerEvent, PickerKey,
    PickerPhase, base_options, block_options_with,
};

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_rich_text();
    editor
        .load(DocumentSource::Markup(html.to_string()))
        .unwrap();
    editor
}

/// Puts the caret at the end of the last text node.
fn caret_at_end(editor: &mut Editor) {
    let state = editor.state();
    let last = *state.table().text_nodes().last().unwrap();
    let len = state.get(last).unwrap().size();
    editor
        .update(|e| {
            e.draft()?.select_collapsed(Point::text(last, len));
            Ok(())
        })
        .unwrap();
}

fn picker_with(options: Vec<BlockOption>) -> BlockPicker {
    BlockPicker::new(options, &FloatingConfig::default()).unwrap()
}

fn ids(picker: &BlockPicker) -> Vec<String> {
    picker.filtered().iter().map(|o| o.id.clone()).collect()
}

fn four_options() -> Vec<BlockOption> {
    base_options()
        .into_iter()
        .filter(|o| ["paragraph", "heading-1", "heading-2", "quote"].contains(&o.id.as_str()))
        .collect()
}

#[test]
fn query_filters_titles_and_keywords_in_order() {
    let mut editor = editor_with("<p>/head</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(four_options());

    picker.on_update(&editor.state());

    assert_eq!(picker.phase(), PickerPhase::Filtering);
    assert_eq!(picker.query(), "head");
    assert_eq!(ids(&picker), vec!["heading-1", "heading-2"]);
}

#[test]
fn arrow_keys_wrap_at_both_ends() {
    let mut editor = editor_with("<p>/head</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(four_options());
    picker.on_update(&editor.state());

    assert_eq!(picker.handle_key(PickerKey::Down), PickerEvent::Highlighted(1));
    assert_eq!(picker.handle_key(PickerKey::Down), PickerEvent::Highlighted(0));
    assert_eq!(picker.handle_key(PickerKey::Up), PickerEvent::Highlighted(1));
    assert_eq!(picker.handle_key(PickerKey::Enter), PickerEvent::Chosen(1));
}

#[test]
fn bare_trigger_lists_every_option() {
    let mut editor = editor_with("<p>text /</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(base_options());

    picker.on_update(&editor.state());

    assert_eq!(picker.phase(), PickerPhase::Triggered);
    assert_eq!(picker.filtered().len(), base_options().len());
    assert_eq!(picker.highlighted(), 0);
}

#[test]
fn trigger_inside_a_word_is_ignored() {
    let mut editor = editor_with("<p>and/or</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(base_options());

    picker.on_update(&editor.state());

    assert_eq!(picker.phase(), PickerPhase::Idle);
    assert_eq!(picker.handle_key(PickerKey::Down), PickerEvent::Ignored);
}

#[test]
fn escape_keeps_the_picker_closed_until_the_trigger_goes_away() {
    let mut editor = editor_with("<p>/qu</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(base_options());
    picker.on_update(&editor.state());
    assert!(picker.is_open());

    assert_eq!(picker.handle_key(PickerKey::Escape), PickerEvent::Dismissed);
    picker.on_update(&editor.state());
    assert_eq!(picker.phase(), PickerPhase::Dismissed);

    let text = editor.state().table().text_nodes()[0];
    editor
        .update(|e| {
            let draft = e.draft()?;
            draft.set_text(text, "plain")?;
            draft.select_collapsed(Point::text(text, 5));
            Ok(())
        })
        .unwrap();
    picker.on_update(&editor.state());
    assert_eq!(picker.phase(), PickerPhase::Idle);
}

#[test]
fn commit_replaces_the_trigger_text() {
    let mut editor = editor_with("<p>hello /he</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(base_options());
    picker.on_update(&editor.state());
    assert_eq!(
        ids(&picker),
        vec!["heading-1", "heading-2", "heading-3", "check-list"]
    );

    let committed = picker.commit(&mut editor).unwrap();

    assert_eq!(committed.as_deref(), Some("heading-1"));
    assert_eq!(
        editor.save().unwrap().html,
        r#"<h1 class="folio-h1">hello </h1>"#
    );
    assert_eq!(picker.phase(), PickerPhase::Idle);
    picker.on_update(&editor.state());
    assert_eq!(picker.phase(), PickerPhase::Idle);
}

#[test]
fn host_options_follow_the_base_set_and_receive_the_query() {
    let options = block_options_with([BlockOption::custom(
        "emoji",
        "Emoji",
        BlockCategory::Advanced,
        |editor, query| {
            editor.dispatch(INSERT_TEXT, format!("<{query}>"))?;
            Ok(())
        },
    )]);
    assert_eq!(options.last().map(|o| o.id.as_str()), Some("emoji"));

    let mut editor = editor_with("<p>hi /emo</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(options);
    picker.on_update(&editor.state());
    assert_eq!(ids(&picker), vec!["emoji"]);

    picker.commit(&mut editor).unwrap();

    assert_eq!(editor.state().text_content(), "hi <emo>");
}

#[test]
fn no_matches_means_nothing_to_commit() {
    let mut editor = editor_with("<p>/zzz</p>");
    caret_at_end(&mut editor);
    let mut picker = picker_with(base_options());
    picker.on_update(&editor.state());

    assert!(picker.filtered().is_empty());
    assert_eq!(picker.handle_key(PickerKey::Enter), PickerEvent::Ignored);
    assert_eq!(picker.commit(&mut editor).unwrap(), None);
    assert_eq!(editor.state().text_content(), "/zzz");
}

#[test]
fn oversized_query_limits_are_reported_instead_of_panicking() {
    let config = FloatingConfig {
        max_query_len: 1_000_000,
        ..FloatingConfig::default()
    };
    assert!(BlockPicker::new(base_options(), &config).is_err());
    assert!(FloatingLayer::new(base_options(), config).is_err());
}
