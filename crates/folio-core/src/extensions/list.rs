use serde_json::Value;

use crate::commands::{
    CommandPriority, CommandRegistration, INSERT_CHECK_LIST, INSERT_ORDERED_LIST,
    INSERT_UNORDERED_LIST, REMOVE_LIST,
};
use crate::draft::Draft;
use crate::editor::Editor;
use crate::error::EditorError;
use crate::extension::{ChildConstraint, Extension, NodeRole, NodeSpec, NormalizePass, ThemeClasses};
use crate::node::{LIST_ITEM_KIND, LIST_KIND, ListType, Node, NodeKey};

/// Numbered, bulleted and check lists.
pub struct ListExtension;

impl Extension for ListExtension {
    fn name(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(
                LIST_KIND,
                NodeRole::Block,
                ChildConstraint::Kinds(vec![LIST_ITEM_KIND.to_string()]),
            ),
            NodeSpec::new(
                LIST_ITEM_KIND,
                NodeRole::Contained,
                ChildConstraint::InlineOr(vec![LIST_KIND.to_string()]),
            ),
        ]
    }

    fn theme(&self) -> ThemeClasses {
        super::theme([
            ("list.ol", "folio-list-ol"),
            ("list.ul", "folio-list-ul"),
            ("list.listitem", "folio-listitem"),
            ("list.checked", "folio-listitem-checked"),
            ("list.unchecked", "folio-listitem-unchecked"),
        ])
    }

    fn commands(&self) -> Vec<CommandRegistration> {
        let priority = CommandPriority::Editor;
        let insert = |list_type: ListType| {
            move |editor: &mut Editor, ()| -> Result<bool, EditorError> {
                editor.draft()?.insert_list(list_type)?;
                Ok(true)
            }
        };
        vec![
            CommandRegistration::new(INSERT_ORDERED_LIST, priority, insert(ListType::Number)),
            CommandRegistration::new(INSERT_UNORDERED_LIST, priority, insert(ListType::Bullet)),
            CommandRegistration::new(INSERT_CHECK_LIST, priority, insert(ListType::Check)),
            CommandRegistration::new(REMOVE_LIST, priority, |editor, ()| {
                editor.draft()?.remove_list()?;
                Ok(true)
            }),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(RemoveEmptyLists), Box::new(ListItemOrdinals)]
    }
}

/// Lists whose items were all removed disappear.
pub struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "list.remove_empty_lists"
    }

    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError> {
        let empty: Vec<NodeKey> = draft
            .nodes_of_kind(LIST_KIND)
            .into_iter()
            .filter(|key| draft.table().children(*key).is_empty())
            .collect();
        for list in &empty {
            if draft.table().contains(*list) {
                draft.remove_and_prune(*list)?;
            }
        }
        Ok(!empty.is_empty())
    }
}

/// Keeps each item's `value` at its 1-based position and gives check list
/// items a `checked` flag. Items outside check lists lose the flag.
pub struct ListItemOrdinals;

impl NormalizePass for ListItemOrdinals {
    fn id(&self) -> &'static str {
        "list.item_ordinals"
    }

    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError> {
        let mut changed = false;
        for list in draft.nodes_of_kind(LIST_KIND) {
            let is_check = draft
                .table()
                .get(list)
                .and_then(Node::list_type)
                .is_some_and(|ty| ty == ListType::Check);
            let items = draft.table().children(list).to_vec();
            for (ix, item) in items.into_iter().enumerate() {
                let Some(node) = draft.table().get(item) else {
                    continue;
                };
                let value = Value::from(ix as u64 + 1);
                let checked = match (is_check, node.attr("checked")) {
                    (true, Some(Value::Bool(_))) => None,
                    (true, _) => Some(Some(Value::Bool(false))),
                    (false, Some(_)) => Some(None),
                    (false, None) => None,
                };
                if node.attr("value") != Some(&value) {
                    draft.set_attr(item, "value", Some(value))?;
                    changed = true;
                }
                if let Some(checked) = checked {
                    draft.set_attr(item, "checked", checked)?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}
