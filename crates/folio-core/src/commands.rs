//! Named, typed editor commands and the built-in command set.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::node::{BlockType, ElementFormat, TextFormatType};
use crate::style::StylePatch;

/// A command name bound to its payload type.
pub struct Command<P> {
    name: &'static str,
    _payload: PhantomData<fn(P)>,
}

impl<P> Command<P> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P> Clone for Command<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Command<P> {}

impl<P> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.name).finish()
    }
}

/// Handler bands, lowest first. Handlers run from the highest band down and
/// the first one returning `Ok(true)` ends dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPriority {
    Editor,
    Low,
    Normal,
    High,
    Critical,
}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, &Value) -> Result<bool, EditorError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

#[derive(Clone)]
pub struct CommandRegistration {
    pub name: String,
    pub priority: CommandPriority,
    pub handler: CommandHandler,
}

impl CommandRegistration {
    /// Wraps a typed handler. Payloads that do not decode as `P` fail with
    /// [`EditorError::InvalidPayload`] before the handler runs.
    pub fn new<P, F>(command: Command<P>, priority: CommandPriority, handler: F) -> Self
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut Editor, P) -> Result<bool, EditorError> + Send + Sync + 'static,
    {
        let name = command.name();
        Self {
            name: name.to_string(),
            priority,
            handler: Arc::new(move |editor: &mut Editor, payload: &Value| {
                let payload = P::deserialize(payload).map_err(|err| {
                    EditorError::InvalidPayload {
                        command: name.to_string(),
                        message: err.to_string(),
                    }
                })?;
                handler(editor, payload)
            }),
        }
    }

    pub fn raw(name: impl Into<String>, priority: CommandPriority, handler: CommandHandler) -> Self {
        Self {
            name: name.into(),
            priority,
            handler,
        }
    }
}

impl fmt::Debug for CommandRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistration")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

pub const FORMAT_TEXT: Command<TextFormatType> = Command::new("format_text");
pub const FORMAT_ELEMENT: Command<ElementFormat> = Command::new("format_element");
pub const SET_BLOCK_TYPE: Command<BlockType> = Command::new("set_block_type");
pub const INSERT_ORDERED_LIST: Command<()> = Command::new("insert_ordered_list");
pub const INSERT_UNORDERED_LIST: Command<()> = Command::new("insert_unordered_list");
pub const INSERT_CHECK_LIST: Command<()> = Command::new("insert_check_list");
pub const REMOVE_LIST: Command<()> = Command::new("remove_list");
pub const INSERT_HORIZONTAL_RULE: Command<()> = Command::new("insert_horizontal_rule");
pub const PATCH_TEXT_STYLE: Command<StylePatch> = Command::new("patch_text_style");
pub const INSERT_TEXT: Command<String> = Command::new("insert_text");
/// Payload is `true` for backspace, `false` for forward delete.
pub const DELETE_CHARACTER: Command<bool> = Command::new("delete_character");
pub const INSERT_PARAGRAPH: Command<()> = Command::new("insert_paragraph");
pub const UNDO: Command<()> = Command::new("undo");
pub const REDO: Command<()> = Command::new("redo");
pub const CLEAR_HISTORY: Command<()> = Command::new("clear_history");
