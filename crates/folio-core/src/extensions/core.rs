use crate::draft::Draft;
use crate::error::EditorError;
use crate::extension::{ChildConstraint, Extension, NodeRole, NodeSpec, NormalizePass, ThemeClasses};
use crate::node::{Node, NodeKey, PARAGRAPH_KIND, ROOT_KIND, TEXT_KIND};

/// Root, paragraph and text, plus the passes every document needs.
pub struct CoreExtension;

impl Extension for CoreExtension {
    fn name(&self) -> &'static str {
        "core"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(ROOT_KIND, NodeRole::Root, ChildConstraint::BlockOnly),
            NodeSpec::new(PARAGRAPH_KIND, NodeRole::Block, ChildConstraint::InlineOnly),
            NodeSpec::new(TEXT_KIND, NodeRole::Inline, ChildConstraint::None),
        ]
    }

    fn theme(&self) -> ThemeClasses {
        super::theme([
            ("paragraph", "folio-paragraph"),
            ("text.bold", "folio-text-bold"),
            ("text.italic", "folio-text-italic"),
            ("text.underline", "folio-text-underline"),
            ("text.strikethrough", "folio-text-strikethrough"),
            ("text.code", "folio-text-code"),
            ("text.subscript", "folio-text-subscript"),
            ("text.superscript", "folio-text-superscript"),
            ("text.highlight", "folio-text-highlight"),
        ])
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyRoot),
            Box::new(EnsureTextBlockHasText),
            Box::new(MergeAdjacentText),
        ]
    }
}

/// A document always has at least one block to put the caret in.
pub struct EnsureNonEmptyRoot;

impl NormalizePass for EnsureNonEmptyRoot {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_root"
    }

    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError> {
        let root = draft.root();
        if !draft.table().children(root).is_empty() {
            return Ok(false);
        }
        let paragraph = draft.create_element(PARAGRAPH_KIND)?;
        draft.append(root, paragraph)?;
        draft.select_start(paragraph);
        Ok(true)
    }
}

/// Text blocks left without children get an empty text leaf.
pub struct EnsureTextBlockHasText;

impl NormalizePass for EnsureTextBlockHasText {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_text"
    }

    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError> {
        let empty: Vec<NodeKey> = draft
            .table()
            .subtree(draft.root())
            .into_iter()
            .filter(|key| {
                draft.table().get(*key).is_some_and(|node| {
                    node.children().is_empty() && draft.registry().is_text_block(node.kind())
                })
            })
            .collect();

        let selection = draft.selection().clone();
        for block in &empty {
            let text = draft.create_text("")?;
            draft.append(*block, text)?;
            for point in [&selection.anchor, &selection.focus] {
                if point.key == *block {
                    draft.select_start(*block);
                }
            }
        }
        Ok(!empty.is_empty())
    }
}

/// Joins neighbouring text nodes that look the same and drops empty ones
/// that have siblings, unless the caret sits in them.
pub struct MergeAdjacentText;

impl NormalizePass for MergeAdjacentText {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text"
    }

    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError> {
        let blocks: Vec<NodeKey> = draft
            .table()
            .subtree(draft.root())
            .into_iter()
            .filter(|key| draft.table().kind(*key).is_some_and(|k| draft.registry().is_text_block(k)))
            .collect();

        let mut changed = false;
        for block in blocks {
            changed |= drop_empty_text(draft, block)?;
            let mut ix = 1;
            while ix < draft.table().children(block).len() {
                let children = draft.table().children(block);
                let (left, right) = (children[ix - 1], children[ix]);
                if same_text_look(draft.table().get(left), draft.table().get(right)) {
                    draft.merge_text(left, right)?;
                    changed = true;
                } else {
                    ix += 1;
                }
            }
        }
        Ok(changed)
    }
}

fn same_text_look(left: Option<&Node>, right: Option<&Node>) -> bool {
    match (left.and_then(Node::as_text), right.and_then(Node::as_text)) {
        (Some(left), Some(right)) => left.format == right.format && left.style == right.style,
        _ => false,
    }
}

fn drop_empty_text(draft: &mut Draft, block: NodeKey) -> Result<bool, EditorError> {
    let children = draft.table().children(block).to_vec();
    if children.len() < 2 {
        return Ok(false);
    }
    let selection = draft.selection();
    let doomed: Vec<NodeKey> = children
        .iter()
        .copied()
        .filter(|key| {
            *key != selection.anchor.key
                && *key != selection.focus.key
                && draft
                    .table()
                    .get(*key)
                    .and_then(Node::as_text)
                    .is_some_and(|t| t.text.is_empty())
        })
        .collect();
    // Keep one child so the block does not empty out.
    let doomed = if doomed.len() == children.len() {
        &doomed[1..]
    } else {
        &doomed[..]
    };
    for key in doomed {
        draft.remove(*key)?;
    }
    Ok(!doomed.is_empty())
}
