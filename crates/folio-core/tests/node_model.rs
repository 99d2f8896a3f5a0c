use std::collections::HashSet;

use folio_core::{
    DocumentSource, Editor, EditorError, LIST_ITEM_KIND, LIST_KIND, NodeData, NodeKey,
    PARAGRAPH_KIND, StructureError,
};

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_rich_text();
    editor
        .load(DocumentSource::Markup(html.to_string()))
        .unwrap();
    editor
}

fn root_children(editor: &Editor) -> Vec<NodeKey> {
    let state = editor.state();
    state.table().children(state.root()).to_vec()
}

#[test]
fn new_editor_holds_one_empty_paragraph() {
    let editor = Editor::with_rich_text();
    let state = editor.state();
    let blocks = root_children(&editor);
    assert_eq!(blocks.len(), 1);
    assert_eq!(state.table().kind(blocks[0]), Some(PARAGRAPH_KIND));
    assert_eq!(state.text_content(), "");
    assert!(state.selection().is_collapsed());
}

#[test]
fn attach_moves_an_attached_node() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    let blocks = root_children(&editor);
    let root = editor.state().root();

    editor.update(|e| e.attach(root, blocks[1], 0)).unwrap();

    assert_eq!(root_children(&editor), vec![blocks[1], blocks[0]]);
    assert_eq!(editor.state().text_content(), "two\none");
}

#[test]
fn attach_rejects_cycles() {
    let mut editor = Editor::with_rich_text();
    let before = editor.state();

    let err = editor
        .update(|e| {
            let outer = e.create_node(NodeData::element(LIST_KIND))?;
            let item = e.create_node(NodeData::element(LIST_ITEM_KIND))?;
            e.attach(outer, item, 0)?;
            let inner = e.create_node(NodeData::element(LIST_KIND))?;
            e.attach(item, inner, 0)?;
            e.attach(inner, outer, 0)
        })
        .unwrap_err();

    assert!(matches!(
        err,
        EditorError::Structure(StructureError::Cycle { .. })
    ));
    assert_eq!(editor.state(), before);
}

#[test]
fn attach_checks_index_and_child_type() {
    let mut editor = Editor::with_rich_text();
    let root = editor.state().root();

    let err = editor
        .update(|e| {
            let paragraph = e.create_node(NodeData::element(PARAGRAPH_KIND))?;
            e.attach(root, paragraph, 5)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Structure(StructureError::IndexOutOfRange { index: 5, len: 1 })
    ));

    let err = editor
        .update(|e| {
            let text = e.create_node(NodeData::text("stray"))?;
            e.attach(root, text, 0)
        })
        .unwrap_err();
    let EditorError::Structure(StructureError::IncompatibleChild { parent, child }) = err else {
        panic!("expected an incompatible child error, got {err:?}");
    };
    assert_eq!(parent, "root");
    assert_eq!(child, "text");
}

#[test]
fn text_nodes_are_not_containers() {
    let mut editor = Editor::with_rich_text();
    let text = editor.state().table().text_nodes()[0];

    let err = editor
        .update(|e| {
            let paragraph = e.create_node(NodeData::element(PARAGRAPH_KIND))?;
            e.attach(text, paragraph, 0)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Structure(StructureError::NotAContainer(key)) if key == text
    ));
}

#[test]
fn root_cannot_be_removed() {
    let mut editor = Editor::with_rich_text();
    let root = editor.state().root();
    let err = editor.update(|e| e.remove(root)).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Structure(StructureError::RootMutation)
    ));
}

#[test]
fn unknown_node_types_are_refused() {
    let mut editor = Editor::with_rich_text();
    let err = editor
        .update(|e| e.create_node(NodeData::element("table")))
        .unwrap_err();
    assert!(matches!(err, EditorError::UnknownNodeType { kind } if kind == "table"));
}

#[test]
fn mutation_outside_update_fails() {
    let mut editor = Editor::with_rich_text();
    let err = editor
        .create_node(NodeData::element(PARAGRAPH_KIND))
        .unwrap_err();
    assert!(matches!(err, EditorError::NotInTransaction));
    assert!(matches!(
        editor.add_tag("x").unwrap_err(),
        EditorError::NotInTransaction
    ));
}

#[test]
fn detached_nodes_are_dropped_at_commit() {
    let mut editor = Editor::with_rich_text();
    let before = editor.state().table().len();

    let key = editor
        .update(|e| e.create_node(NodeData::element(PARAGRAPH_KIND)))
        .unwrap();

    assert_eq!(editor.state().table().len(), before);
    assert!(editor.state().get(key).is_none());
}

#[test]
fn removed_node_is_gone_from_the_draft() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    let blocks = root_children(&editor);

    editor
        .update(|e| {
            e.remove(blocks[0])?;
            assert!(e.get_latest(blocks[0]).is_none());
            Ok(())
        })
        .unwrap();

    // The committed snapshot only changes once the update returns.
    assert_eq!(root_children(&editor), vec![blocks[1]]);
    assert_eq!(editor.state().text_content(), "two");
}

#[test]
fn emptied_text_block_gets_an_empty_text_leaf() {
    let mut editor = editor_with("<p>one</p>");
    let paragraph = root_children(&editor)[0];
    let text = editor.state().table().text_nodes()[0];

    editor.update(|e| e.remove(text)).unwrap();

    let state = editor.state();
    let children = state.table().children(paragraph);
    assert_eq!(children.len(), 1);
    assert_ne!(children[0], text);
    assert_eq!(state.text_content(), "");
}

#[test]
fn removing_every_block_leaves_a_paragraph() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    let blocks = root_children(&editor);

    editor
        .update(|e| {
            for block in &blocks {
                e.remove(*block)?;
            }
            Ok(())
        })
        .unwrap();

    let state = editor.state();
    let remaining = root_children(&editor);
    assert_eq!(remaining.len(), 1);
    assert_eq!(state.table().kind(remaining[0]), Some(PARAGRAPH_KIND));
    assert_eq!(state.table().validate(editor.registry()), Ok(()));
}

fn assert_single_rooted(editor: &Editor) {
    let state = editor.state();
    let table = state.table();
    assert_eq!(table.validate(editor.registry()), Ok(()));
    assert!(table.unreachable().is_empty());

    let reachable = table.subtree(state.root());
    let unique: HashSet<NodeKey> = reachable.iter().copied().collect();
    assert_eq!(unique.len(), reachable.len());
    assert_eq!(reachable.len(), table.len());
    for key in reachable {
        if let Some(parent) = table.parent(key) {
            let slots = table.children(parent).iter().filter(|c| **c == key).count();
            assert_eq!(slots, 1);
        }
    }
}

#[test]
fn mixed_attach_and_remove_keeps_one_rooted_tree() {
    let mut editor = editor_with("<p>one</p><ul><li>two</li><li>three</li></ul><p>four</p>");
    assert_single_rooted(&editor);
    let [one, list, four] = root_children(&editor)[..] else {
        panic!("expected three blocks");
    };
    let root = editor.state().root();
    let [two, three] = editor.state().table().children(list)[..] else {
        panic!("expected two items");
    };

    let nested = editor
        .update(|e| {
            let nested = e.create_node(NodeData::element(LIST_KIND))?;
            let item = e.create_node(NodeData::element(LIST_ITEM_KIND))?;
            let text = e.create_node(NodeData::text("inner"))?;
            e.attach(item, text, 0)?;
            e.attach(nested, item, 0)?;
            e.attach(two, nested, 1)?;
            Ok(nested)
        })
        .unwrap();
    assert_single_rooted(&editor);

    editor.update(|e| e.attach(nested, three, 1)).unwrap();
    assert_single_rooted(&editor);
    assert_eq!(editor.state().table().parent(three), Some(nested));
    assert_eq!(editor.state().table().children(list), &[two]);

    editor.update(|e| e.attach(root, four, 0)).unwrap();
    assert_single_rooted(&editor);
    assert_eq!(root_children(&editor), vec![four, one, list]);

    editor.update(|e| e.remove(nested)).unwrap();
    assert_single_rooted(&editor);
    assert!(!editor.state().table().contains(three));
    assert_eq!(editor.state().text_content(), "four\none\ntwo");

    editor.update(|e| e.attach(root, list, 0)).unwrap();
    assert_single_rooted(&editor);
    assert_eq!(editor.state().text_content(), "two\nfour\none");

    editor.update(|e| e.remove(two)).unwrap();
    assert_single_rooted(&editor);
    assert!(!editor.state().table().contains(list));
    assert_eq!(root_children(&editor), vec![four, one]);
}
