use folio_core::{Editor, EditorError, EditorState, NodeKey, PARAGRAPH_KIND, Point};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::config::FloatingConfig;
use crate::options::BlockOption;

/// Characters that end a query. Kept free of `--`, `&&` and `~~` so it can
/// sit inside a character class.
const PUNCTUATION: &str = r#"\.,\+\*\?\$@\|#\{\}\(\)\^\-\[\]\\/!%'"~=<>_:;"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerPhase {
    Idle,
    /// Open with an empty query.
    Triggered,
    Filtering,
    /// Closed by the user while the trigger text is still in place.
    Dismissed,
}

/// The trigger character and query found before the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub key: NodeKey,
    /// Character offset of the trigger.
    pub start: usize,
    /// Character offset of the caret.
    pub end: usize,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Typed(TriggerMatch),
    /// Opened from the block handle on a fresh paragraph.
    Placeholder(NodeKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Ignored,
    Highlighted(usize),
    /// Enter on an option; call [`BlockPicker::commit`].
    Chosen(usize),
    Dismissed,
}

/// Indexes of `options` whose title or a keyword matches `query`, in
/// registration order. The query is a case-insensitive regex; one that does
/// not compile is matched literally.
pub fn filter_options(options: &[BlockOption], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..options.len()).collect();
    }
    let pattern = RegexBuilder::new(query)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(query))
                .case_insensitive(true)
                .build()
        });
    let Ok(pattern) = pattern else {
        return Vec::new();
    };
    options
        .iter()
        .enumerate()
        .filter(|(_, option)| option.matches(&pattern))
        .map(|(ix, _)| ix)
        .collect()
}

pub struct BlockPicker {
    options: Vec<BlockOption>,
    trigger: Regex,
    phase: PickerPhase,
    origin: Option<Origin>,
    query: String,
    filtered: Vec<usize>,
    highlighted: usize,
}

impl BlockPicker {
    /// Fails when `max_query_len` makes the trigger pattern too large to
    /// compile.
    pub fn new(options: Vec<BlockOption>, config: &FloatingConfig) -> Result<Self, regex::Error> {
        let trigger = regex::escape(&config.trigger.to_string());
        let pattern = format!(
            r"(^|\s|\()({trigger}((?:[^{trigger}{PUNCTUATION}]){{0,{max}}}))$",
            max = config.max_query_len,
        );
        let trigger = Regex::new(&pattern)?;
        let filtered = (0..options.len()).collect();
        Ok(Self {
            options,
            trigger,
            phase: PickerPhase::Idle,
            origin: None,
            query: String::new(),
            filtered,
            highlighted: 0,
        })
    }

    pub fn phase(&self) -> PickerPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, PickerPhase::Triggered | PickerPhase::Filtering)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> &[BlockOption] {
        &self.options
    }

    /// Options matching the current query.
    pub fn filtered(&self) -> Vec<&BlockOption> {
        self.filtered.iter().map(|ix| &self.options[*ix]).collect()
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted_option(&self) -> Option<&BlockOption> {
        self.filtered
            .get(self.highlighted)
            .map(|ix| &self.options[*ix])
    }

    /// The placeholder paragraph the picker was opened for, if any.
    pub fn placeholder(&self) -> Option<NodeKey> {
        match &self.origin {
            Some(Origin::Placeholder(key)) => Some(*key),
            _ => None,
        }
    }

    /// Trigger text before a collapsed caret.
    pub fn detect_trigger(&self, state: &EditorState) -> Option<TriggerMatch> {
        let selection = state.selection();
        if !selection.is_collapsed() {
            return None;
        }
        let point = state.table().text_point(&selection.anchor)?;
        let text = state.get(point.key)?.as_text()?;
        let before: String = text.text.chars().take(point.offset).collect();
        let captures = self.trigger.captures(&before)?;
        let whole = captures.get(2)?;
        let query = captures.get(3).map_or("", |m| m.as_str());
        Some(TriggerMatch {
            key: point.key,
            start: before[..whole.start()].chars().count(),
            end: point.offset,
            query: query.to_string(),
        })
    }

    /// Follows a committed state: opens on a trigger, tracks the query and
    /// closes once the trigger text is gone.
    pub fn on_update(&mut self, state: &EditorState) {
        if let Some(Origin::Placeholder(key)) = self.origin {
            if !state.table().is_attached(key) {
                self.reset();
            }
            return;
        }

        let Some(found) = self.detect_trigger(state) else {
            self.reset();
            return;
        };
        if let Some(Origin::Typed(previous)) = &self.origin {
            let same_trigger = previous.key == found.key && previous.start == found.start;
            if self.phase == PickerPhase::Dismissed && same_trigger {
                return;
            }
        }
        self.query = found.query.clone();
        self.origin = Some(Origin::Typed(found));
        self.phase = if self.query.is_empty() {
            PickerPhase::Triggered
        } else {
            PickerPhase::Filtering
        };
        self.refilter();
    }

    /// Opens for a placeholder paragraph with an empty query.
    pub fn open_for(&mut self, placeholder: NodeKey) {
        self.origin = Some(Origin::Placeholder(placeholder));
        self.phase = PickerPhase::Triggered;
        self.query.clear();
        self.highlighted = 0;
        self.refilter();
    }

    /// Sets the query typed into the picker's own input.
    pub fn set_query(&mut self, query: impl Into<String>) {
        if !self.is_open() {
            return;
        }
        self.query = query.into();
        self.highlighted = 0;
        self.phase = if self.query.is_empty() {
            PickerPhase::Triggered
        } else {
            PickerPhase::Filtering
        };
        self.refilter();
    }

    pub fn set_highlighted(&mut self, index: usize) {
        self.highlighted = index.min(self.filtered.len().saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: PickerKey) -> PickerEvent {
        if !self.is_open() {
            return PickerEvent::Ignored;
        }
        let len = self.filtered.len();
        match key {
            PickerKey::Escape => {
                self.dismiss();
                PickerEvent::Dismissed
            }
            _ if len == 0 => PickerEvent::Ignored,
            PickerKey::Down => {
                self.highlighted = if self.highlighted + 1 >= len {
                    0
                } else {
                    self.highlighted + 1
                };
                PickerEvent::Highlighted(self.highlighted)
            }
            PickerKey::Up => {
                self.highlighted = if self.highlighted == 0 {
                    len - 1
                } else {
                    self.highlighted - 1
                };
                PickerEvent::Highlighted(self.highlighted)
            }
            PickerKey::Enter => PickerEvent::Chosen(self.highlighted.min(len - 1)),
        }
    }

    /// A pointer press outside the picker closes it.
    pub fn pointer_down_outside(&mut self) {
        if self.is_open() {
            self.dismiss();
        }
    }

    pub fn dismiss(&mut self) {
        match self.origin {
            Some(Origin::Typed(_)) => self.phase = PickerPhase::Dismissed,
            _ => self.reset(),
        }
    }

    /// Commits the highlighted option. Returns the committed option's id, or
    /// `None` when nothing matches.
    pub fn commit(&mut self, editor: &mut Editor) -> Result<Option<String>, EditorError> {
        let Some(ix) = self.filtered.get(self.highlighted).copied() else {
            return Ok(None);
        };
        self.commit_index(editor, ix)
    }

    /// Commits the option with `id`, e.g. after a click.
    pub fn commit_option(
        &mut self,
        editor: &mut Editor,
        id: &str,
    ) -> Result<Option<String>, EditorError> {
        let Some(ix) = self.options.iter().position(|o| o.id == id) else {
            return Ok(None);
        };
        self.commit_index(editor, ix)
    }

    fn commit_index(
        &mut self,
        editor: &mut Editor,
        ix: usize,
    ) -> Result<Option<String>, EditorError> {
        if !self.is_open() {
            return Ok(None);
        }
        let option = self.options[ix].clone();
        let query = std::mem::take(&mut self.query);
        let origin = match self.origin.take() {
            Some(Origin::Typed(_)) => self.detect_trigger(&editor.state()).map(Origin::Typed),
            origin => origin,
        };
        self.reset();

        debug!(option = %option.id, query = %query, "block picker commit");
        editor.update(|editor| {
            let placeholder = match &origin {
                Some(Origin::Typed(found)) => {
                    let draft = editor.draft()?;
                    draft.splice_text(found.key, found.start, found.end - found.start, "")?;
                    draft.select_collapsed(Point::text(found.key, found.start));
                    None
                }
                Some(Origin::Placeholder(block)) => {
                    let draft = editor.draft()?;
                    if let Some(text) = draft.table().first_text(*block) {
                        draft.select_collapsed(Point::text(text, 0));
                    }
                    Some(*block)
                }
                None => None,
            };

            option.insert(editor, &query)?;

            if let Some(block) = placeholder {
                remove_if_still_empty(editor, block)?;
            }
            Ok(())
        })?;
        Ok(Some(option.id))
    }

    fn refilter(&mut self) {
        self.filtered = filter_options(&self.options, &self.query);
        self.highlighted = self.highlighted.min(self.filtered.len().saturating_sub(1));
    }

    fn reset(&mut self) {
        self.phase = PickerPhase::Idle;
        self.origin = None;
        self.query.clear();
        self.highlighted = 0;
        self.filtered = (0..self.options.len()).collect();
    }
}

/// Drops a placeholder paragraph whose only child is still an empty text.
fn remove_if_still_empty(editor: &mut Editor, block: NodeKey) -> Result<(), EditorError> {
    let draft = editor.draft()?;
    let table = draft.table();
    let still_empty = table.is_attached(block)
        && table.kind(block) == Some(PARAGRAPH_KIND)
        && match table.children(block) {
            [only] => table
                .get(*only)
                .and_then(|n| n.as_text())
                .is_some_and(|t| t.text.is_empty()),
            _ => false,
        };
    if still_empty {
        draft.remove(block)?;
    }
    Ok(())
}
