use std::sync::Arc;

use crate::state::EditorState;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: Arc<EditorState>,
    pub after: Arc<EditorState>,
    pub merge_tag: Option<String>,
}

/// Undo/redo stacks built from committed states.
#[derive(Debug)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_depth: usize,
    merge: bool,
    selection_moved: bool,
}

impl History {
    pub fn new(max_depth: usize, merge: bool) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth,
            merge,
            selection_moved: false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Records a committed change. Extends the previous entry instead when
    /// both carry the same merge tag and only document edits happened in
    /// between.
    pub fn record(
        &mut self,
        before: Arc<EditorState>,
        after: Arc<EditorState>,
        merge_tag: Option<String>,
    ) {
        self.redo.clear();
        let selection_moved = std::mem::take(&mut self.selection_moved);
        if self.merge && !selection_moved && merge_tag.is_some() {
            if let Some(last) = self.undo.last_mut() {
                if last.merge_tag == merge_tag {
                    last.after = after;
                    return;
                }
            }
        }
        self.undo.push(HistoryEntry {
            before,
            after,
            merge_tag,
        });
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }

    /// A commit that only moved the selection breaks merging.
    pub fn note_selection_change(&mut self) {
        self.selection_moved = true;
    }

    pub fn undo_target(&self) -> Option<Arc<EditorState>> {
        self.undo.last().map(|entry| Arc::clone(&entry.before))
    }

    pub fn redo_target(&self) -> Option<Arc<EditorState>> {
        self.redo.last().map(|entry| Arc::clone(&entry.after))
    }

    pub(crate) fn finish_undo(&mut self) {
        if let Some(entry) = self.undo.pop() {
            self.redo.push(entry);
        }
        self.selection_moved = true;
    }

    pub(crate) fn finish_redo(&mut self) {
        if let Some(entry) = self.redo.pop() {
            self.undo.push(entry);
        }
        self.selection_moved = true;
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.selection_moved = false;
    }
}
