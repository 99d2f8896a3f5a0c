use crate::commands::{
    CommandPriority, CommandRegistration, DELETE_CHARACTER, FORMAT_ELEMENT, FORMAT_TEXT,
    INSERT_PARAGRAPH, INSERT_TEXT, PATCH_TEXT_STYLE, SET_BLOCK_TYPE,
};
use crate::extension::{ChildConstraint, Extension, NodeRole, NodeSpec, ThemeClasses};
use crate::node::{HEADING_KIND, QUOTE_KIND};

/// Consecutive typing collapses into one undo step.
pub const TYPING_MERGE_TAG: &str = "typing";

/// Headings, quotes and the commands that edit and format text.
pub struct RichTextExtension;

impl Extension for RichTextExtension {
    fn name(&self) -> &'static str {
        "rich_text"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(HEADING_KIND, NodeRole::Block, ChildConstraint::InlineOnly),
            NodeSpec::new(QUOTE_KIND, NodeRole::Block, ChildConstraint::InlineOnly),
        ]
    }

    fn theme(&self) -> ThemeClasses {
        super::theme([
            ("heading.h1", "folio-h1"),
            ("heading.h2", "folio-h2"),
            ("heading.h3", "folio-h3"),
            ("heading.h4", "folio-h4"),
            ("heading.h5", "folio-h5"),
            ("heading.h6", "folio-h6"),
            ("quote", "folio-quote"),
        ])
    }

    fn commands(&self) -> Vec<CommandRegistration> {
        let priority = CommandPriority::Editor;
        vec![
            CommandRegistration::new(FORMAT_TEXT, priority, |editor, ty| {
                editor.draft()?.format_text(ty)?;
                Ok(true)
            }),
            CommandRegistration::new(FORMAT_ELEMENT, priority, |editor, format| {
                editor.draft()?.format_element(format)?;
                Ok(true)
            }),
            CommandRegistration::new(SET_BLOCK_TYPE, priority, |editor, block_type| {
                editor.draft()?.set_blocks_type(block_type)?;
                Ok(true)
            }),
            CommandRegistration::new(PATCH_TEXT_STYLE, priority, |editor, patch| {
                editor.draft()?.patch_text_style(&patch)?;
                Ok(true)
            }),
            CommandRegistration::new(INSERT_TEXT, priority, |editor, text: String| {
                editor.set_merge_tag(TYPING_MERGE_TAG)?;
                editor.draft()?.insert_text(&text)?;
                Ok(true)
            }),
            CommandRegistration::new(DELETE_CHARACTER, priority, |editor, backward| {
                editor.draft()?.delete_character(backward)?;
                Ok(true)
            }),
            CommandRegistration::new(INSERT_PARAGRAPH, priority, |editor, ()| {
                editor.draft()?.insert_paragraph()?;
                Ok(true)
            }),
        ]
    }
}
