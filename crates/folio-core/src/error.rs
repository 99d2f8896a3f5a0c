use thiserror::Error;

use crate::node::NodeKey;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("mutation attempted outside of an update")]
    NotInTransaction,

    #[error("node type `{kind}` is already registered")]
    DuplicateType { kind: String },

    #[error("extension `{name}` is already registered")]
    DuplicateExtension { name: String },

    #[error("unknown node type `{kind}`")]
    UnknownNodeType { kind: String },

    #[error("invalid payload for command `{command}`: {message}")]
    InvalidPayload { command: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported snapshot `{schema}` version {version}")]
    UnsupportedSnapshot { schema: String, version: u32 },

    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("normalization did not converge after {iterations} iterations")]
    NormalizeDidNotConverge { iterations: usize },

    #[error("editor is read-only")]
    ReadOnly,
}

/// Illegal tree shape. Raised by the node primitives before anything is
/// mutated, and by commit validation for anything that slipped through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: NodeKey, child: NodeKey },

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("`{child}` is not permitted inside `{parent}`")]
    IncompatibleChild { parent: String, child: String },

    #[error("node {0} does not exist")]
    UnknownNode(NodeKey),

    #[error("node {0} cannot hold children")]
    NotAContainer(NodeKey),

    #[error("the root node cannot be moved or removed")]
    RootMutation,

    #[error("node {0} is not attached to the tree")]
    Detached(NodeKey),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at byte {offset}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

impl MarkupError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}
