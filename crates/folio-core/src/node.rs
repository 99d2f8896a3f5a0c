use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Attrs = BTreeMap<String, Value>;

pub const ROOT_KIND: &str = "root";
pub const TEXT_KIND: &str = "text";
pub const PARAGRAPH_KIND: &str = "paragraph";
pub const HEADING_KIND: &str = "heading";
pub const QUOTE_KIND: &str = "quote";
pub const LIST_KIND: &str = "list";
pub const LIST_ITEM_KIND: &str = "list_item";
pub const HORIZONTAL_RULE_KIND: &str = "horizontal_rule";

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of a node. Allocated from a process-wide counter, so a key is
/// never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(u64);

impl NodeKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) data: NodeData,
    pub(crate) children: Vec<NodeKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(TextData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub kind: String,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextData {
    pub text: String,
    pub format: TextFormat,
    pub style: String,
}

impl NodeData {
    pub fn element(kind: impl Into<String>) -> Self {
        NodeData::Element(ElementData {
            kind: kind.into(),
            attrs: Attrs::default(),
        })
    }

    pub fn element_with(kind: impl Into<String>, attrs: Attrs) -> Self {
        NodeData::Element(ElementData {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        NodeData::Text(TextData {
            text: text.into(),
            ..TextData::default()
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            NodeData::Element(el) => &el.kind,
            NodeData::Text(_) => TEXT_KIND,
        }
    }
}

impl Node {
    pub(crate) fn new(key: NodeKey, data: NodeData) -> Self {
        Self {
            key,
            parent: None,
            data,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn kind(&self) -> &str {
        self.data.kind()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_root(&self) -> bool {
        self.kind() == ROOT_KIND
    }

    pub fn as_text(&self) -> Option<&TextData> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.as_element().and_then(|el| el.attrs.get(name))
    }

    /// Offset bound for a point on this node: characters for text, children
    /// for elements.
    pub fn size(&self) -> usize {
        match &self.data {
            NodeData::Text(t) => t.text.chars().count(),
            NodeData::Element(_) => self.children.len(),
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        if self.kind() != HEADING_KIND {
            return None;
        }
        let level = self.attr("level").and_then(|v| v.as_u64()).unwrap_or(1);
        Some(level.clamp(1, 6) as u8)
    }

    pub fn list_type(&self) -> Option<ListType> {
        if self.kind() != LIST_KIND {
            return None;
        }
        self.attr("list_type")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .or(Some(ListType::Bullet))
    }

    pub fn element_format(&self) -> Option<ElementFormat> {
        self.attr("format")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Bitmask of inline text formats. Bit positions match the values used by
/// persisted documents, so they must not be reordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFormat(u32);

impl TextFormat {
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(1 << 1);
    pub const STRIKETHROUGH: Self = Self(1 << 2);
    pub const UNDERLINE: Self = Self(1 << 3);
    pub const CODE: Self = Self(1 << 4);
    pub const SUBSCRIPT: Self = Self(1 << 5);
    pub const SUPERSCRIPT: Self = Self(1 << 6);
    pub const HIGHLIGHT: Self = Self(1 << 7);
    pub const LOWERCASE: Self = Self(1 << 8);
    pub const UPPERCASE: Self = Self(1 << 9);
    pub const CAPITALIZE: Self = Self(1 << 10);

    const CASE: Self = Self(Self::LOWERCASE.0 | Self::UPPERCASE.0 | Self::CAPITALIZE.0);
    const SCRIPT: Self = Self(Self::SUBSCRIPT.0 | Self::SUPERSCRIPT.0);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn has(self, ty: TextFormatType) -> bool {
        self.contains(ty.flag())
    }

    /// Sets or clears one format. Sub/superscript are exclusive, as are the
    /// three case transforms.
    pub fn with(mut self, ty: TextFormatType, on: bool) -> Self {
        let flag = ty.flag();
        if on {
            if Self::SCRIPT.contains(flag) {
                self.remove(Self::SCRIPT);
            }
            if Self::CASE.contains(flag) {
                self.remove(Self::CASE);
            }
            self.insert(flag);
        } else {
            self.remove(flag);
        }
        self
    }

    pub fn toggled(self, ty: TextFormatType) -> Self {
        self.with(ty, !self.has(ty))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormatType {
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Code,
    Subscript,
    Superscript,
    Highlight,
    Lowercase,
    Uppercase,
    Capitalize,
}

impl TextFormatType {
    pub const ALL: [TextFormatType; 11] = [
        TextFormatType::Bold,
        TextFormatType::Italic,
        TextFormatType::Strikethrough,
        TextFormatType::Underline,
        TextFormatType::Code,
        TextFormatType::Subscript,
        TextFormatType::Superscript,
        TextFormatType::Highlight,
        TextFormatType::Lowercase,
        TextFormatType::Uppercase,
        TextFormatType::Capitalize,
    ];

    pub fn flag(self) -> TextFormat {
        match self {
            TextFormatType::Bold => TextFormat::BOLD,
            TextFormatType::Italic => TextFormat::ITALIC,
            TextFormatType::Strikethrough => TextFormat::STRIKETHROUGH,
            TextFormatType::Underline => TextFormat::UNDERLINE,
            TextFormatType::Code => TextFormat::CODE,
            TextFormatType::Subscript => TextFormat::SUBSCRIPT,
            TextFormatType::Superscript => TextFormat::SUPERSCRIPT,
            TextFormatType::Highlight => TextFormat::HIGHLIGHT,
            TextFormatType::Lowercase => TextFormat::LOWERCASE,
            TextFormatType::Uppercase => TextFormat::UPPERCASE,
            TextFormatType::Capitalize => TextFormat::CAPITALIZE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextFormatType::Bold => "bold",
            TextFormatType::Italic => "italic",
            TextFormatType::Strikethrough => "strikethrough",
            TextFormatType::Underline => "underline",
            TextFormatType::Code => "code",
            TextFormatType::Subscript => "subscript",
            TextFormatType::Superscript => "superscript",
            TextFormatType::Highlight => "highlight",
            TextFormatType::Lowercase => "lowercase",
            TextFormatType::Uppercase => "uppercase",
            TextFormatType::Capitalize => "capitalize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementFormat {
    Left,
    Center,
    Right,
    Justify,
    Start,
    End,
}

impl ElementFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementFormat::Left => "left",
            ElementFormat::Center => "center",
            ElementFormat::Right => "right",
            ElementFormat::Justify => "justify",
            ElementFormat::Start => "start",
            ElementFormat::End => "end",
        }
    }

    pub fn is_trailing(self) -> bool {
        matches!(self, ElementFormat::Right | ElementFormat::End)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Number,
    Bullet,
    Check,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Number => "number",
            ListType::Bullet => "bullet",
            ListType::Check => "check",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    Quote,
}
