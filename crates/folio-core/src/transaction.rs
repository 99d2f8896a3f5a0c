use std::collections::BTreeSet;
use std::sync::Arc;

use crate::node::NodeKey;
use crate::state::EditorState;

/// Tag carried by commits produced by undo and redo.
pub const HISTORIC_TAG: &str = "historic";
/// Tag carried by the commit that materializes a loaded document.
pub const LOAD_TAG: &str = "load";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub tags: BTreeSet<String>,
    pub merge_tag: Option<String>,
    pub skip_history: bool,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Consecutive commits with the same merge tag collapse into one undo
    /// step.
    pub fn merge_tag(mut self, tag: impl Into<String>) -> Self {
        self.merge_tag = Some(tag.into());
        self
    }

    pub fn skip_history(mut self, skip: bool) -> Self {
        self.skip_history = skip;
        self
    }
}

/// What listeners see after each commit.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub state: Arc<EditorState>,
    pub prev_state: Arc<EditorState>,
    pub dirty: BTreeSet<NodeKey>,
    pub tags: BTreeSet<String>,
    pub tree_changed: bool,
    pub selection_changed: bool,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl UpdateEvent {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Pending re-render. Commits made before the host takes the frame fold
/// into it.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub state: Arc<EditorState>,
    pub dirty: BTreeSet<NodeKey>,
    pub commits: usize,
}

impl RenderFrame {
    pub(crate) fn fold(frame: Option<RenderFrame>, state: Arc<EditorState>, dirty: &BTreeSet<NodeKey>) -> Self {
        match frame {
            Some(mut frame) => {
                frame.state = state;
                frame.dirty.extend(dirty.iter().copied());
                frame.commits += 1;
                frame
            }
            None => RenderFrame {
                state,
                dirty: dirty.clone(),
                commits: 1,
            },
        }
    }
}
