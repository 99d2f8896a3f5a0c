use serde::{Deserialize, Serialize};

use crate::draft::Draft;
use crate::error::{EditorError, StructureError};
use crate::node::{Attrs, NodeData, NodeKey, ROOT_KIND, TextData, TextFormat};
use crate::state::NodeTable;

pub const SNAPSHOT_SCHEMA: &str = "folio";
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_schema() -> String {
    SNAPSHOT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// The persisted form of a document. Keys are not stored; loading allocates
/// fresh ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDocument {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub root: SerializedNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum SerializedNode {
    Element(SerializedElement),
    Text(SerializedText),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedElement {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "TextFormat::is_empty")]
    pub format: TextFormat,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,
}

impl SerializedNode {
    pub fn element(kind: impl Into<String>, children: Vec<SerializedNode>) -> Self {
        SerializedNode::Element(SerializedElement {
            kind: kind.into(),
            attrs: Attrs::new(),
            children,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        SerializedNode::Text(SerializedText {
            text: text.into(),
            format: TextFormat::empty(),
            style: String::new(),
        })
    }

    /// A root with no children. Normalization fills in the empty paragraph.
    pub fn empty_root() -> Self {
        Self::element(ROOT_KIND, Vec::new())
    }

    pub fn kind(&self) -> &str {
        match self {
            SerializedNode::Element(el) => &el.kind,
            SerializedNode::Text(_) => crate::node::TEXT_KIND,
        }
    }

    fn from_table(table: &NodeTable, key: NodeKey) -> Option<Self> {
        let node = table.get(key)?;
        Some(match node.data() {
            NodeData::Text(text) => SerializedNode::Text(SerializedText {
                text: text.text.clone(),
                format: text.format,
                style: text.style.clone(),
            }),
            NodeData::Element(el) => SerializedNode::Element(SerializedElement {
                kind: el.kind.clone(),
                attrs: el.attrs.clone(),
                children: node
                    .children()
                    .iter()
                    .filter_map(|child| Self::from_table(table, *child))
                    .collect(),
            }),
        })
    }
}

impl SerializedDocument {
    pub fn new(root: SerializedNode) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            root,
        }
    }

    pub fn from_table(table: &NodeTable) -> Self {
        let root = SerializedNode::from_table(table, table.root())
            .unwrap_or_else(SerializedNode::empty_root);
        Self::new(root)
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot. Unknown schemas and newer versions are refused
    /// rather than guessed at.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let document: Self = serde_json::from_str(json)?;
        if document.schema != SNAPSHOT_SCHEMA || document.version > SNAPSHOT_VERSION {
            return Err(EditorError::UnsupportedSnapshot {
                schema: document.schema,
                version: document.version,
            });
        }
        Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// JSON produced by [`SerializedDocument::to_json`].
    Snapshot(String),
    /// HTML markup, see [`crate::markup::parse_markup`].
    Markup(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    pub snapshot: String,
    pub html: String,
    pub text: String,
}

impl Draft {
    /// Builds a detached subtree from its serialized form. Every node goes
    /// through the usual type checks.
    pub fn materialize(&mut self, node: &SerializedNode) -> Result<NodeKey, EditorError> {
        match node {
            SerializedNode::Text(text) => self.create_node(NodeData::Text(TextData {
                text: text.text.clone(),
                format: text.format,
                style: text.style.clone(),
            })),
            SerializedNode::Element(el) => {
                let key = self.create_element_with(&el.kind, el.attrs.clone())?;
                for child in &el.children {
                    let child = self.materialize(child)?;
                    self.append(key, child)?;
                }
                Ok(key)
            }
        }
    }

    /// Swaps the whole document for `root`, keeping the root key.
    pub(crate) fn replace_document(&mut self, root: &SerializedNode) -> Result<(), EditorError> {
        let SerializedNode::Element(el) = root else {
            return Err(StructureError::Invariant("document root must be an element".into()).into());
        };
        if el.kind != ROOT_KIND {
            return Err(StructureError::Invariant(format!(
                "document root must be `{ROOT_KIND}`, found `{}`",
                el.kind
            ))
            .into());
        }

        let root_key = self.root();
        for child in self.table.children(root_key).to_vec() {
            self.remove(child)?;
        }
        let stale: Vec<String> = self
            .table
            .get(root_key)
            .and_then(|node| node.as_element())
            .map(|current| {
                current
                    .attrs
                    .keys()
                    .filter(|name| !el.attrs.contains_key(*name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for name in stale {
            self.set_attr(root_key, &name, None)?;
        }
        for (name, value) in &el.attrs {
            self.set_attr(root_key, name, Some(value.clone()))?;
        }
        for child in &el.children {
            let key = self.materialize(child)?;
            self.append(root_key, key)?;
        }
        self.select_start(root_key);
        Ok(())
    }
}
