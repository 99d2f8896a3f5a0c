use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::commands::{Command, CommandHandler, CommandPriority, CommandRegistration, HandlerId};
use crate::config::EditorConfig;
use crate::draft::Draft;
use crate::error::EditorError;
use crate::extension::{DecoratorSpec, ExtensionRegistry, ThemeClasses};
use crate::history::History;
use crate::html::HtmlRenderer;
use crate::markup::parse_markup;
use crate::node::{Node, NodeData, NodeKey, PARAGRAPH_KIND};
use crate::selection::{self, Point, Selection};
use crate::serialize::{DocumentSource, SavePayload, SerializedDocument, SerializedNode};
use crate::state::{EditorState, NodeTable};
use crate::transaction::{HISTORIC_TAG, LOAD_TAG, RenderFrame, UpdateEvent, UpdateOptions};

pub type UpdateListener = Box<dyn FnMut(&UpdateEvent) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryOp {
    Undo,
    Redo,
}

struct Pending {
    draft: Draft,
    options: UpdateOptions,
    history_op: Option<HistoryOp>,
}

struct HandlerEntry {
    id: HandlerId,
    priority: CommandPriority,
    handler: CommandHandler,
}

pub struct Editor {
    registry: Arc<ExtensionRegistry>,
    config: EditorConfig,
    theme: ThemeClasses,
    state: Arc<EditorState>,
    pending: Option<Pending>,
    commands: HashMap<String, Vec<HandlerEntry>>,
    next_handler: u64,
    listeners: Vec<(ListenerId, UpdateListener)>,
    next_listener: u64,
    history: History,
    render: Option<RenderFrame>,
    editable: bool,
}

impl Editor {
    pub fn new(registry: ExtensionRegistry, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let registry = Arc::new(registry);
        let mut theme = registry.theme().clone();
        theme.extend(config.theme.clone());

        let mut editor = Self {
            state: Arc::new(empty_document()),
            registry: Arc::clone(&registry),
            theme,
            pending: None,
            commands: HashMap::new(),
            next_handler: 0,
            listeners: Vec::new(),
            next_listener: 0,
            history: History::new(config.max_undo, config.history_merge),
            render: None,
            editable: config.editable,
            config,
        };
        for registration in registry.commands() {
            editor.install(registration.clone());
        }
        editor
    }

    pub fn with_rich_text() -> Self {
        Self::new(ExtensionRegistry::rich_text(), EditorConfig::default())
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn theme(&self) -> &ThemeClasses {
        &self.theme
    }

    pub fn decorators(&self) -> &[DecoratorSpec] {
        self.registry.decorators()
    }

    pub fn root_class(&self) -> String {
        format!("{}-editor", self.config.namespace)
    }

    pub fn state(&self) -> Arc<EditorState> {
        Arc::clone(&self.state)
    }

    pub fn read<T>(&self, f: impl FnOnce(&EditorState) -> T) -> T {
        f(&self.state)
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn in_update(&self) -> bool {
        self.pending.is_some()
    }

    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        self.update_with(UpdateOptions::default(), f)
    }

    /// Runs `f` against a draft and commits it.
    ///
    /// Called while another update is open, `f` writes into that update's
    /// draft and nothing commits until the outermost call returns. A failing
    /// nested call rolls the draft back to where it entered; a failing
    /// outermost call discards the draft and leaves the committed state as
    /// it was.
    pub fn update_with<T>(
        &mut self,
        options: UpdateOptions,
        f: impl FnOnce(&mut Editor) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        if let Some(pending) = self.pending.as_mut() {
            let savepoint = pending.draft.savepoint();
            let saved_options = pending.options.clone();
            let saved_op = pending.history_op;
            pending.options.tags.extend(options.tags);
            if options.merge_tag.is_some() {
                pending.options.merge_tag = options.merge_tag;
            }
            pending.options.skip_history |= options.skip_history;

            let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
            if !matches!(result, Ok(Ok(_))) {
                if let Some(pending) = self.pending.as_mut() {
                    pending.draft.restore(savepoint);
                    pending.options = saved_options;
                    pending.history_op = saved_op;
                }
            }
            return result.unwrap_or_else(|payload| panic::resume_unwind(payload));
        }

        let span = tracing::debug_span!("update", namespace = %self.config.namespace);
        let _entered = span.enter();

        self.pending = Some(Pending {
            draft: Draft::new(&self.state, Arc::clone(&self.registry)),
            options,
            history_op: None,
        });
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        let pending = self.pending.take();
        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                warn!("update panicked, draft discarded");
                panic::resume_unwind(payload);
            }
        };
        match (result, pending) {
            (Ok(value), Some(pending)) => {
                self.commit(pending)?;
                Ok(value)
            }
            (Ok(value), None) => Ok(value),
            (Err(err), _) => {
                warn!(error = %err, "update rolled back");
                Err(err)
            }
        }
    }

    pub fn draft(&mut self) -> Result<&mut Draft, EditorError> {
        self.pending
            .as_mut()
            .map(|pending| &mut pending.draft)
            .ok_or(EditorError::NotInTransaction)
    }

    pub fn create_node(&mut self, data: NodeData) -> Result<NodeKey, EditorError> {
        self.draft()?.create_node(data)
    }

    pub fn attach(&mut self, parent: NodeKey, key: NodeKey, index: usize) -> Result<(), EditorError> {
        self.draft()?.attach(parent, key, index)
    }

    pub fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        self.draft()?.remove(key)
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        self.draft()?.set_selection(selection);
        Ok(())
    }

    /// The node as seen by the open draft, or by the committed state when
    /// no update is running.
    pub fn get_latest(&self, key: NodeKey) -> Option<Arc<Node>> {
        let table = match &self.pending {
            Some(pending) => pending.draft.table(),
            None => self.state.table(),
        };
        table.get_arc(key).cloned()
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> Result<(), EditorError> {
        let pending = self.pending.as_mut().ok_or(EditorError::NotInTransaction)?;
        pending.options.tags.insert(tag.into());
        Ok(())
    }

    pub fn set_merge_tag(&mut self, tag: impl Into<String>) -> Result<(), EditorError> {
        let pending = self.pending.as_mut().ok_or(EditorError::NotInTransaction)?;
        pending.options.merge_tag = Some(tag.into());
        Ok(())
    }

    fn run_normalize_passes(&self, draft: &mut Draft) -> Result<(), EditorError> {
        let max = self.config.max_normalize_iterations;
        for _ in 0..max {
            let mut changed = false;
            for pass in self.registry.normalize_passes() {
                if pass.run(draft)? {
                    trace!(pass = pass.id(), "normalize pass changed the draft");
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(EditorError::NormalizeDidNotConverge { iterations: max })
    }

    fn commit(&mut self, pending: Pending) -> Result<(), EditorError> {
        let Pending {
            mut draft,
            options,
            history_op,
        } = pending;

        if let Err(err) = self.run_normalize_passes(&mut draft) {
            warn!(error = %err, "update rolled back during normalization");
            return Err(err);
        }
        let collected = draft.collect_garbage();
        if let Err(err) = draft.table().validate(&self.registry) {
            warn!(error = %err, "update rolled back: invalid tree");
            return Err(err.into());
        }

        let (table, selection, dirty, modified) = draft.into_parts();
        let selection = selection::normalize(&selection, &self.state.table, &table);
        let tree_changed = modified && table.differs_from(&self.state.table);
        let selection_changed = selection != self.state.selection;

        if !tree_changed && !selection_changed {
            match history_op {
                Some(HistoryOp::Undo) => self.history.finish_undo(),
                Some(HistoryOp::Redo) => self.history.finish_redo(),
                None => {}
            }
            trace!("update produced no changes");
            return Ok(());
        }

        let prev = Arc::clone(&self.state);
        let next = Arc::new(EditorState::new(table, selection));
        self.state = Arc::clone(&next);
        let dirty: BTreeSet<NodeKey> = dirty
            .into_iter()
            .filter(|k| next.table.contains(*k))
            .collect();

        let history_action = match history_op {
            Some(HistoryOp::Undo) => {
                self.history.finish_undo();
                "undo"
            }
            Some(HistoryOp::Redo) => {
                self.history.finish_redo();
                "redo"
            }
            None if !tree_changed => {
                self.history.note_selection_change();
                "selection"
            }
            None if options.skip_history || options.tags.contains(HISTORIC_TAG) => "skipped",
            None => {
                self.history
                    .record(Arc::clone(&prev), Arc::clone(&next), options.merge_tag.clone());
                "recorded"
            }
        };

        self.render = Some(RenderFrame::fold(self.render.take(), Arc::clone(&next), &dirty));
        debug!(
            dirty = dirty.len(),
            collected,
            tags = ?options.tags,
            history = history_action,
            "committed update"
        );

        let event = UpdateEvent {
            state: next,
            prev_state: prev,
            dirty,
            tags: options.tags,
            tree_changed,
            selection_changed,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        self.notify(&event);
        Ok(())
    }

    fn notify(&mut self, event: &UpdateEvent) {
        for (id, listener) in self.listeners.iter_mut() {
            trace!(listener = id.0, "notifying update listener");
            match panic::catch_unwind(AssertUnwindSafe(|| (*listener)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(listener = id.0, error = %err, "update listener failed"),
                Err(_) => warn!(listener = id.0, "update listener panicked"),
            }
        }
    }

    /// Called once per commit, in commit order. A failing or panicking
    /// listener is logged and skipped.
    pub fn register_update_listener(
        &mut self,
        listener: impl FnMut(&UpdateEvent) -> anyhow::Result<()> + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unregister_update_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// The coalesced re-render scheduled since the last call.
    pub fn take_render(&mut self) -> Option<RenderFrame> {
        self.render.take()
    }

    fn install(&mut self, registration: CommandRegistration) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        let entries = self.commands.entry(registration.name).or_default();
        entries.push(HandlerEntry {
            id,
            priority: registration.priority,
            handler: registration.handler,
        });
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        id
    }

    pub fn register_command<P, F>(
        &mut self,
        command: Command<P>,
        priority: CommandPriority,
        handler: F,
    ) -> HandlerId
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut Editor, P) -> Result<bool, EditorError> + Send + Sync + 'static,
    {
        self.install(CommandRegistration::new(command, priority, handler))
    }

    pub fn register_command_raw(&mut self, registration: CommandRegistration) -> HandlerId {
        self.install(registration)
    }

    pub fn unregister_command(&mut self, id: HandlerId) -> bool {
        let mut removed = false;
        for entries in self.commands.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed |= entries.len() != before;
        }
        removed
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.get(name).is_some_and(|entries| !entries.is_empty())
    }

    pub fn dispatch<P: Serialize>(&mut self, command: Command<P>, payload: P) -> Result<bool, EditorError> {
        let payload = serde_json::to_value(payload)?;
        self.dispatch_command(command.name(), payload)
    }

    /// Runs the handler chain for `name` inside one update: highest priority
    /// first, earlier registrations first within a band, stopping at the
    /// first handler that reports the command handled.
    pub fn dispatch_command(&mut self, name: &str, payload: Value) -> Result<bool, EditorError> {
        if !self.editable {
            return Err(EditorError::ReadOnly);
        }
        let handlers: Vec<(HandlerId, CommandHandler)> = self
            .commands
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                    .collect()
            })
            .unwrap_or_default();
        if handlers.is_empty() {
            trace!(command = name, "no handler registered");
            return Ok(false);
        }

        self.update(|editor| {
            for (id, handler) in handlers {
                trace!(command = name, handler = id.0, "running command handler");
                if (handler)(editor, &payload)? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(target) = self.history.undo_target() else {
            return Ok(false);
        };
        self.apply_history(target, HistoryOp::Undo)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(target) = self.history.redo_target() else {
            return Ok(false);
        };
        self.apply_history(target, HistoryOp::Redo)
    }

    fn apply_history(&mut self, target: Arc<EditorState>, op: HistoryOp) -> Result<bool, EditorError> {
        self.update_with(UpdateOptions::new().tag(HISTORIC_TAG), |editor| {
            let pending = editor
                .pending
                .as_mut()
                .ok_or(EditorError::NotInTransaction)?;
            pending.draft.reset_to(&target);
            pending.history_op = Some(op);
            Ok(true)
        })
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Replaces the document with `source` in a single commit that history
    /// ignores, then starts history afresh.
    pub fn load(&mut self, source: DocumentSource) -> Result<(), EditorError> {
        let root = match source {
            DocumentSource::Snapshot(json) => SerializedDocument::from_json(&json)?.root,
            DocumentSource::Markup(html) => parse_markup(&html)?,
            DocumentSource::Empty => SerializedNode::empty_root(),
        };
        self.update_with(
            UpdateOptions::new().tag(LOAD_TAG).skip_history(true),
            |editor| editor.draft()?.replace_document(&root),
        )?;
        self.history.clear();
        Ok(())
    }

    pub fn save(&self) -> Result<SavePayload, EditorError> {
        let snapshot = SerializedDocument::from_table(self.state.table()).to_json()?;
        let html = HtmlRenderer::new(&self.theme).render(self.state.table());
        Ok(SavePayload {
            snapshot,
            html,
            text: self.state.text_content(),
        })
    }
}

fn empty_document() -> EditorState {
    let mut table = NodeTable::with_root();
    let root = table.root();
    let paragraph = NodeKey::next();
    let text = NodeKey::next();

    let mut paragraph_node = Node::new(paragraph, NodeData::element(PARAGRAPH_KIND));
    paragraph_node.parent = Some(root);
    paragraph_node.children.push(text);
    let mut text_node = Node::new(text, NodeData::text(""));
    text_node.parent = Some(paragraph);

    table.insert(paragraph_node);
    table.insert(text_node);
    if let Some(root_node) = table.node_mut(root) {
        root_node.children.push(paragraph);
    }
    EditorState::new(table, Selection::collapsed(Point::text(text, 0)))
}
