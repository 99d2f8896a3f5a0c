use std::fmt;
use std::sync::Arc;

use folio_core::commands::{
    FORMAT_ELEMENT, INSERT_CHECK_LIST, INSERT_HORIZONTAL_RULE, INSERT_ORDERED_LIST,
    INSERT_UNORDERED_LIST, SET_BLOCK_TYPE,
};
use folio_core::{BlockType, Editor, EditorError, ElementFormat, ListType};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Basic,
    Headings,
    Lists,
    Quotes,
    Dividers,
    Alignment,
    Advanced,
}

pub type InsertFn = Arc<dyn Fn(&mut Editor, &str) -> Result<(), EditorError> + Send + Sync>;

/// What choosing an option does. Built-in actions go through the command
/// bus so host handlers can intercept them.
#[derive(Clone)]
pub enum BlockAction {
    SetBlockType(BlockType),
    InsertList(ListType),
    InsertHorizontalRule,
    Align(ElementFormat),
    /// Receives the query typed after the trigger.
    Custom(InsertFn),
}

impl BlockAction {
    pub fn apply(&self, editor: &mut Editor, query: &str) -> Result<(), EditorError> {
        match self {
            BlockAction::SetBlockType(block_type) => {
                editor.dispatch(SET_BLOCK_TYPE, *block_type)?;
            }
            BlockAction::InsertList(ListType::Number) => {
                editor.dispatch(INSERT_ORDERED_LIST, ())?;
            }
            BlockAction::InsertList(ListType::Bullet) => {
                editor.dispatch(INSERT_UNORDERED_LIST, ())?;
            }
            BlockAction::InsertList(ListType::Check) => {
                editor.dispatch(INSERT_CHECK_LIST, ())?;
            }
            BlockAction::InsertHorizontalRule => {
                editor.dispatch(INSERT_HORIZONTAL_RULE, ())?;
            }
            BlockAction::Align(format) => {
                editor.dispatch(FORMAT_ELEMENT, *format)?;
            }
            BlockAction::Custom(insert) => insert(editor, query)?,
        }
        Ok(())
    }
}

impl fmt::Debug for BlockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockAction::SetBlockType(t) => f.debug_tuple("SetBlockType").field(t).finish(),
            BlockAction::InsertList(t) => f.debug_tuple("InsertList").field(t).finish(),
            BlockAction::InsertHorizontalRule => f.write_str("InsertHorizontalRule"),
            BlockAction::Align(format) => f.debug_tuple("Align").field(format).finish(),
            BlockAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// An entry of the block picker and the toolbar's block menu.
#[derive(Debug, Clone)]
pub struct BlockOption {
    pub id: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub category: BlockCategory,
    pub shortcut: Option<String>,
    action: BlockAction,
}

impl BlockOption {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: BlockCategory,
        action: BlockAction,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            keywords: Vec::new(),
            category,
            shortcut: None,
            action,
        }
    }

    /// An option backed by a host closure.
    pub fn custom<F>(
        id: impl Into<String>,
        title: impl Into<String>,
        category: BlockCategory,
        insert: F,
    ) -> Self
    where
        F: Fn(&mut Editor, &str) -> Result<(), EditorError> + Send + Sync + 'static,
    {
        Self::new(id, title, category, BlockAction::Custom(Arc::new(insert)))
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn action(&self) -> &BlockAction {
        &self.action
    }

    /// True when the title or any keyword matches.
    pub fn matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.title) || self.keywords.iter().any(|k| pattern.is_match(k))
    }

    pub fn insert(&self, editor: &mut Editor, query: &str) -> Result<(), EditorError> {
        self.action.apply(editor, query)
    }
}

/// The built-in options, in menu order.
pub fn base_options() -> Vec<BlockOption> {
    use BlockCategory::*;

    vec![
        BlockOption::new(
            "paragraph",
            "Paragraph",
            Basic,
            BlockAction::SetBlockType(BlockType::Paragraph),
        )
        .keywords(["normal", "paragraph", "p", "text"]),
        BlockOption::new(
            "heading-1",
            "Heading 1",
            Headings,
            BlockAction::SetBlockType(BlockType::Heading(1)),
        )
        .keywords(["heading", "header", "h1"]),
        BlockOption::new(
            "heading-2",
            "Heading 2",
            Headings,
            BlockAction::SetBlockType(BlockType::Heading(2)),
        )
        .keywords(["heading", "header", "h2"]),
        BlockOption::new(
            "heading-3",
            "Heading 3",
            Headings,
            BlockAction::SetBlockType(BlockType::Heading(3)),
        )
        .keywords(["heading", "header", "h3"]),
        BlockOption::new(
            "ordered-list",
            "Numbered List",
            Lists,
            BlockAction::InsertList(ListType::Number),
        )
        .keywords(["numbered list", "ordered list", "ol"]),
        BlockOption::new(
            "unordered-list",
            "Bulleted List",
            Lists,
            BlockAction::InsertList(ListType::Bullet),
        )
        .keywords(["bulleted list", "unordered list", "ul"]),
        BlockOption::new(
            "check-list",
            "Check List",
            Lists,
            BlockAction::InsertList(ListType::Check),
        )
        .keywords(["check list", "todo list"]),
        BlockOption::new(
            "quote",
            "Quote",
            Quotes,
            BlockAction::SetBlockType(BlockType::Quote),
        )
        .keywords(["block quote", "quote"]),
        BlockOption::new("divider", "Divider", Dividers, BlockAction::InsertHorizontalRule)
            .keywords(["horizontal rule", "divider", "hr"]),
        BlockOption::new(
            "align-left",
            "Align left",
            Alignment,
            BlockAction::Align(ElementFormat::Left),
        )
        .keywords(["align", "left"]),
        BlockOption::new(
            "align-center",
            "Align center",
            Alignment,
            BlockAction::Align(ElementFormat::Center),
        )
        .keywords(["align", "center"]),
        BlockOption::new(
            "align-right",
            "Align right",
            Alignment,
            BlockAction::Align(ElementFormat::Right),
        )
        .keywords(["align", "right"]),
    ]
}

/// Base options followed by host options.
pub fn block_options_with(extra: impl IntoIterator<Item = BlockOption>) -> Vec<BlockOption> {
    let mut options = base_options();
    options.extend(extra);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_ids_are_unique() {
        let options = base_options();
        let mut ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), options.len());
    }

    #[test]
    fn keywords_take_part_in_matching() {
        let option = base_options().remove(8);
        assert_eq!(option.id, "divider");
        assert!(option.matches(&Regex::new("(?i)HR").unwrap()));
        assert!(!option.matches(&Regex::new("(?i)quote").unwrap()));
    }
}
