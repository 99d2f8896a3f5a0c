use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::commands::CommandRegistration;
use crate::draft::Draft;
use crate::error::EditorError;
use crate::extensions::{
    CoreExtension, HistoryExtension, HorizontalRuleExtension, ListExtension, RichTextExtension,
};

/// Theme key → CSS class name, e.g. `"heading.h1" → "folio-h1"`.
pub type ThemeClasses = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Root,
    Block,
    Inline,
    /// Only allowed under parents that name it explicitly.
    Contained,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    /// Inline nodes plus the named kinds.
    InlineOr(Vec<String>),
    Kinds(Vec<String>),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>, role: NodeRole, children: ChildConstraint) -> Self {
        Self {
            kind: kind.into(),
            role,
            is_void: false,
            children,
        }
    }

    pub fn void(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoratorSlot {
    /// Positioned over the content, follows the selection.
    Floating,
    /// Beside blocks, follows the pointer.
    Gutter,
    Overlay,
}

/// A UI contribution rendered next to the document. The registry only keeps
/// the declaration; hosts look decorators up by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorSpec {
    pub key: String,
    pub slot: DecoratorSlot,
    pub order: i32,
}

impl DecoratorSpec {
    pub fn new(key: impl Into<String>, slot: DecoratorSlot) -> Self {
        Self {
            key: key.into(),
            slot,
            order: 0,
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// A fix-up run on the draft before commit. Returns whether it changed
/// anything; the editor repeats all passes until none do.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, draft: &mut Draft) -> Result<bool, EditorError>;
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn theme(&self) -> ThemeClasses {
        ThemeClasses::new()
    }
    fn commands(&self) -> Vec<CommandRegistration> {
        Vec::new()
    }
    fn decorators(&self) -> Vec<DecoratorSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
}

/// Everything the registered extensions contribute, assembled once and then
/// shared read-only by the editor.
pub struct ExtensionRegistry {
    extensions: Vec<&'static str>,
    node_specs: HashMap<String, NodeSpec>,
    theme: ThemeClasses,
    commands: Vec<CommandRegistration>,
    decorators: Vec<DecoratorSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
}

impl ExtensionRegistry {
    pub fn new(
        extensions: impl IntoIterator<Item = Box<dyn Extension>>,
    ) -> Result<Self, EditorError> {
        let mut registry = Self {
            extensions: Vec::new(),
            node_specs: HashMap::new(),
            theme: ThemeClasses::new(),
            commands: Vec::new(),
            decorators: Vec::new(),
            normalize_passes: Vec::new(),
        };
        registry.register(Box::new(CoreExtension))?;
        for extension in extensions {
            registry.register(extension)?;
        }
        tracing::debug!(
            extensions = ?registry.extensions,
            node_types = registry.node_specs.len(),
            commands = registry.commands.len(),
            "extension registry assembled"
        );
        Ok(registry)
    }

    pub fn core() -> Self {
        Self::new(Vec::new()).expect("core registry must be valid")
    }

    pub fn rich_text() -> Self {
        Self::rich_text_with(Vec::new()).expect("rich text registry must be valid")
    }

    /// The rich text set plus host extensions, which register last.
    pub fn rich_text_with(
        extra: impl IntoIterator<Item = Box<dyn Extension>>,
    ) -> Result<Self, EditorError> {
        let mut extensions: Vec<Box<dyn Extension>> = vec![
            Box::new(RichTextExtension),
            Box::new(ListExtension),
            Box::new(HorizontalRuleExtension),
            Box::new(HistoryExtension),
        ];
        extensions.extend(extra);
        Self::new(extensions)
    }

    /// Adds one extension. Nothing is registered when any of its node types
    /// or its name is already taken.
    pub fn register(&mut self, extension: Box<dyn Extension>) -> Result<(), EditorError> {
        let name = extension.name();
        if self.extensions.contains(&name) {
            return Err(EditorError::DuplicateExtension {
                name: name.to_string(),
            });
        }

        let specs = extension.node_specs();
        let mut incoming = HashSet::new();
        for spec in &specs {
            if self.node_specs.contains_key(&spec.kind) || !incoming.insert(spec.kind.as_str()) {
                return Err(EditorError::DuplicateType {
                    kind: spec.kind.clone(),
                });
            }
        }

        for spec in specs {
            self.node_specs.insert(spec.kind.clone(), spec);
        }
        self.theme.extend(extension.theme());
        self.commands.extend(extension.commands());
        self.decorators.extend(extension.decorators());
        self.decorators.sort_by_key(|d| d.order);
        self.normalize_passes.extend(extension.normalize_passes());
        self.extensions.push(name);
        Ok(())
    }

    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }

    pub fn theme(&self) -> &ThemeClasses {
        &self.theme
    }

    pub fn commands(&self) -> &[CommandRegistration] {
        &self.commands
    }

    pub fn decorators(&self) -> &[DecoratorSpec] {
        &self.decorators
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn can_contain(&self, parent: &str, child: &str) -> bool {
        let (Some(parent), Some(child)) = (self.node_specs.get(parent), self.node_specs.get(child))
        else {
            return false;
        };
        if parent.is_void {
            return false;
        }
        match &parent.children {
            ChildConstraint::None => false,
            ChildConstraint::BlockOnly => child.role == NodeRole::Block,
            ChildConstraint::InlineOnly => child.role == NodeRole::Inline,
            ChildConstraint::InlineOr(kinds) => {
                child.role == NodeRole::Inline || kinds.iter().any(|k| *k == child.kind)
            }
            ChildConstraint::Kinds(kinds) => kinds.iter().any(|k| *k == child.kind),
            ChildConstraint::Any => child.role != NodeRole::Root,
        }
    }

    /// Elements whose children are inline content: the places a caret can
    /// type into.
    pub fn is_text_block(&self, kind: &str) -> bool {
        self.node_specs.get(kind).is_some_and(|spec| {
            matches!(
                spec.children,
                ChildConstraint::InlineOnly | ChildConstraint::InlineOr(_)
            )
        })
    }

    pub fn is_void(&self, kind: &str) -> bool {
        self.node_specs.get(kind).is_some_and(|spec| spec.is_void)
    }
}
