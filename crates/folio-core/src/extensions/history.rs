use crate::commands::{CLEAR_HISTORY, CommandPriority, CommandRegistration, REDO, UNDO};
use crate::extension::Extension;

/// Exposes undo, redo and clearing as commands. The stacks themselves
/// live on the editor.
pub struct HistoryExtension;

impl Extension for HistoryExtension {
    fn name(&self) -> &'static str {
        "history"
    }

    fn commands(&self) -> Vec<CommandRegistration> {
        let priority = CommandPriority::Editor;
        vec![
            CommandRegistration::new(UNDO, priority, |editor, ()| editor.undo()),
            CommandRegistration::new(REDO, priority, |editor, ()| editor.redo()),
            CommandRegistration::new(CLEAR_HISTORY, priority, |editor, ()| {
                editor.clear_history();
                Ok(true)
            }),
        ]
    }
}
