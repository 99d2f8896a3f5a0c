//! Reader for HTML documents saved by older versions, and for the markup
//! written by [`crate::html::HtmlRenderer`].
//!
//! Only the tags the renderer emits are understood, plus a few common
//! aliases. Anything else is transparent: its content is kept, the tag is
//! not.

use serde_json::Value;

use crate::error::MarkupError;
use crate::node::{
    Attrs, ElementFormat, HEADING_KIND, HORIZONTAL_RULE_KIND, LIST_ITEM_KIND, LIST_KIND, ListType,
    PARAGRAPH_KIND, QUOTE_KIND, ROOT_KIND, TextFormat,
};
use crate::serialize::{SerializedElement, SerializedNode, SerializedText};
use crate::style::{parse_style, style_to_css};

pub fn parse_markup(html: &str) -> Result<SerializedNode, MarkupError> {
    let tokens = tokenize(html)?;
    let mut builder = TreeBuilder::new();
    for token in tokens {
        builder.feed(token);
    }
    Ok(builder.finish())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Open { name: String, attrs: Vec<(String, String)> },
    Close { name: String },
}

fn tokenize(html: &str) -> Result<Vec<Token>, MarkupError> {
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &html[pos..];
        let is_tag = rest.starts_with("<!")
            || rest.starts_with("</")
            || bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic);
        if !is_tag {
            pos += 1;
            continue;
        }
        if text_start < pos {
            tokens.push(Token::Text(decode_entities(&html[text_start..pos])));
        }

        if rest.starts_with("<!--") {
            let end = rest
                .find("-->")
                .ok_or_else(|| MarkupError::new(pos, "unterminated comment"))?;
            pos += end + 3;
        } else if rest.starts_with("<!") {
            let end = rest
                .find('>')
                .ok_or_else(|| MarkupError::new(pos, "unterminated declaration"))?;
            pos += end + 1;
        } else if let Some(close) = rest.strip_prefix("</") {
            let end = close
                .find('>')
                .ok_or_else(|| MarkupError::new(pos, "unterminated end tag"))?;
            let name = close[..end].trim().to_ascii_lowercase();
            tokens.push(Token::Close { name });
            pos += end + 3;
        } else {
            let (token, next) = read_open_tag(html, pos)?;
            tokens.push(token);
            pos = next;
        }
        text_start = pos;
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(decode_entities(&html[text_start..])));
    }
    Ok(tokens)
}

/// Reads `<name attr="value" ...>` starting at the `<`. Returns the token
/// and the position after the closing `>`.
fn read_open_tag(html: &str, start: usize) -> Result<(Token, usize), MarkupError> {
    let bytes = html.as_bytes();
    let unterminated = || MarkupError::new(start, "unterminated tag");
    let mut pos = start + 1;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-') {
        pos += 1;
    }
    let name = html[start + 1..pos].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return Err(unterminated()),
            Some(b'>') => return Ok((Token::Open { name, attrs }, pos + 1)),
            Some(b'/') => {
                pos += 1;
                continue;
            }
            Some(_) => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let attr_name = html[name_start..pos].to_ascii_lowercase();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attrs.push((attr_name, String::new()));
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos) {
            None => return Err(unterminated()),
            Some(&(quote @ (b'"' | b'\''))) => {
                let open = pos;
                let len = html[pos + 1..]
                    .find(quote as char)
                    .ok_or_else(|| MarkupError::new(open, "unterminated attribute value"))?;
                let value = &html[pos + 1..pos + 1 + len];
                pos += len + 2;
                value
            }
            Some(_) => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                &html[value_start..pos]
            }
        };
        attrs.push((attr_name, decode_entities(value)));
    }
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let ch = match &rest[1..end] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                entity => numeric_entity(entity),
            }?;
            Some((ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let hex = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X'));
    let code = match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Holds blocks: the root, or a list holding items.
    Container,
    /// Holds inline content.
    TextBlock,
}

struct BlockFrame {
    tag: String,
    kind: FrameKind,
    element: SerializedElement,
    /// Opened by a tag, as opposed to made up for stray content.
    explicit: bool,
    inline_base: usize,
}

struct InlineFrame {
    tag: String,
    format: TextFormat,
    style: Vec<(String, String)>,
}

struct TreeBuilder {
    blocks: Vec<BlockFrame>,
    inline: Vec<InlineFrame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            blocks: vec![BlockFrame {
                tag: String::new(),
                kind: FrameKind::Container,
                element: element(ROOT_KIND, Attrs::new()),
                explicit: true,
                inline_base: 0,
            }],
            inline: Vec::new(),
        }
    }

    fn top(&self) -> &BlockFrame {
        &self.blocks[self.blocks.len() - 1]
    }

    fn top_kind(&self) -> &str {
        &self.top().element.kind
    }

    fn feed(&mut self, token: Token) {
        match token {
            Token::Text(text) => self.text(&text),
            Token::Open { name, attrs } => self.open(name, &attrs),
            Token::Close { name } => self.close(&name),
        }
    }

    fn open(&mut self, name: String, attrs: &[(String, String)]) {
        match name.as_str() {
            "p" | "div" => self.open_text_block(name, PARAGRAPH_KIND, block_attrs(attrs)),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let mut node_attrs = block_attrs(attrs);
                let level = name[1..].parse::<u64>().unwrap_or(1);
                node_attrs.insert("level".to_string(), Value::from(level));
                self.open_text_block(name, HEADING_KIND, node_attrs);
            }
            "blockquote" => self.open_text_block(name, QUOTE_KIND, block_attrs(attrs)),
            "ul" | "ol" => self.open_list(name, attrs),
            "li" => self.open_list_item(name, attrs),
            "hr" => {
                self.close_text_blocks();
                if self.top_kind() == ROOT_KIND {
                    self.push_child(SerializedNode::Element(element(HORIZONTAL_RULE_KIND, Attrs::new())));
                }
            }
            "br" => self.push_text("\n"),
            _ => {
                if let Some((format, style)) = inline_format(&name, attrs) {
                    self.inline.push(InlineFrame {
                        tag: name,
                        format,
                        style,
                    });
                }
            }
        }
    }

    fn close(&mut self, name: &str) {
        if is_block_tag(name) {
            if let Some(ix) = self.blocks.iter().rposition(|frame| frame.tag == name) {
                if ix > 0 {
                    while self.blocks.len() > ix {
                        self.pop_block();
                    }
                }
            }
        } else if let Some(ix) = self.inline.iter().rposition(|frame| frame.tag == name) {
            self.inline.truncate(ix);
        }
    }

    fn open_text_block(&mut self, tag: String, kind: &str, attrs: Attrs) {
        if self.in_transparent_block() {
            if self.top().element.children.iter().any(|c| !is_blank(c)) {
                self.push_text("\n");
            }
            return;
        }
        self.close_text_blocks();
        if self.top_kind() == LIST_KIND {
            self.open_implicit_block();
            return;
        }
        self.push_block(tag, FrameKind::TextBlock, kind, attrs, true);
    }

    fn open_list(&mut self, tag: String, attrs: &[(String, String)]) {
        while self.top().kind == FrameKind::TextBlock && self.top_kind() != LIST_ITEM_KIND {
            self.pop_block();
        }
        if self.top_kind() == LIST_KIND {
            self.open_implicit_block();
        }
        let is_check = attrs.iter().any(|(k, v)| k == "data-list" && v == "check");
        let list_type = match (tag.as_str(), is_check) {
            (_, true) => ListType::Check,
            ("ol", _) => ListType::Number,
            _ => ListType::Bullet,
        };
        let mut node_attrs = block_attrs(attrs);
        node_attrs.insert("list_type".to_string(), Value::from(list_type.as_str()));
        self.push_block(tag, FrameKind::Container, LIST_KIND, node_attrs, true);
    }

    fn open_list_item(&mut self, tag: String, attrs: &[(String, String)]) {
        self.close_text_blocks();
        let mut node_attrs = block_attrs(attrs);
        if self.top_kind() != LIST_KIND {
            self.push_block(tag, FrameKind::TextBlock, PARAGRAPH_KIND, node_attrs, true);
            return;
        }
        if let Some((_, checked)) = attrs.iter().find(|(k, _)| k == "aria-checked") {
            node_attrs.insert("checked".to_string(), Value::Bool(checked == "true"));
        }
        self.push_block(tag, FrameKind::TextBlock, LIST_ITEM_KIND, node_attrs, true);
    }

    fn text(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return;
        }
        if self.top().kind == FrameKind::Container {
            if text.trim().is_empty() {
                return;
            }
            self.open_implicit_block();
        }
        self.push_text(&text);
    }

    /// Wraps stray inline content: an item inside lists, a paragraph
    /// elsewhere.
    fn open_implicit_block(&mut self) {
        let kind = if self.top_kind() == LIST_KIND {
            LIST_ITEM_KIND
        } else {
            PARAGRAPH_KIND
        };
        self.push_block(String::new(), FrameKind::TextBlock, kind, Attrs::new(), false);
    }

    /// Appends inline text under the current formats, merging into the
    /// previous text node when the formats match.
    fn push_text(&mut self, text: &str) {
        if self.top().kind == FrameKind::Container {
            if text.trim().is_empty() {
                return;
            }
            self.open_implicit_block();
        }
        let mut format = TextFormat::empty();
        let mut style: Vec<(String, String)> = Vec::new();
        for frame in &self.inline {
            format.insert(frame.format);
            for (prop, value) in &frame.style {
                style.retain(|(p, _)| p != prop);
                style.push((prop.clone(), value.clone()));
            }
        }
        let style = style_to_css(&style);

        let Some(frame) = self.blocks.last_mut() else {
            return;
        };
        if let Some(SerializedNode::Text(last)) = frame.element.children.last_mut() {
            if last.format == format && last.style == style {
                last.text.push_str(text);
                return;
            }
        }
        frame.element.children.push(SerializedNode::Text(SerializedText {
            text: text.to_string(),
            format,
            style,
        }));
    }

    fn push_block(&mut self, tag: String, kind: FrameKind, node_kind: &str, attrs: Attrs, explicit: bool) {
        let inline_base = self.inline.len();
        self.blocks.push(BlockFrame {
            tag,
            kind,
            element: element(node_kind, attrs),
            explicit,
            inline_base,
        });
    }

    fn push_child(&mut self, child: SerializedNode) {
        if let Some(frame) = self.blocks.last_mut() {
            frame.element.children.push(child);
        }
    }

    fn pop_block(&mut self) {
        if self.blocks.len() <= 1 {
            return;
        }
        let Some(mut frame) = self.blocks.pop() else {
            return;
        };
        self.inline.truncate(frame.inline_base.min(self.inline.len()));
        if frame.kind == FrameKind::TextBlock {
            tidy_inline(&mut frame.element.children);
        }
        if frame.element.children.is_empty() && !frame.explicit {
            return;
        }
        self.push_child(SerializedNode::Element(frame.element));
    }

    /// Quotes and list items swallow nested paragraph tags.
    fn in_transparent_block(&self) -> bool {
        let top = self.top();
        top.kind == FrameKind::TextBlock && matches!(top.element.kind.as_str(), QUOTE_KIND | LIST_ITEM_KIND)
    }

    fn close_text_blocks(&mut self) {
        while self.top().kind == FrameKind::TextBlock {
            self.pop_block();
        }
    }

    fn finish(mut self) -> SerializedNode {
        while self.blocks.len() > 1 {
            self.pop_block();
        }
        match self.blocks.pop() {
            Some(root) => SerializedNode::Element(root.element),
            None => SerializedNode::empty_root(),
        }
    }
}

fn element(kind: &str, attrs: Attrs) -> SerializedElement {
    SerializedElement {
        kind: kind.to_string(),
        attrs,
        children: Vec::new(),
    }
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "ul" | "ol" | "li"
    )
}

fn is_blank(node: &SerializedNode) -> bool {
    match node {
        SerializedNode::Text(text) => text.text.trim().is_empty(),
        SerializedNode::Element(_) => false,
    }
}

fn inline_format(name: &str, attrs: &[(String, String)]) -> Option<(TextFormat, Vec<(String, String)>)> {
    let format = match name {
        "b" | "strong" => TextFormat::BOLD,
        "i" | "em" => TextFormat::ITALIC,
        "u" => TextFormat::UNDERLINE,
        "s" | "strike" | "del" => TextFormat::STRIKETHROUGH,
        "code" => TextFormat::CODE,
        "sub" => TextFormat::SUBSCRIPT,
        "sup" => TextFormat::SUPERSCRIPT,
        "mark" => TextFormat::HIGHLIGHT,
        "span" => {
            let mut format = TextFormat::empty();
            let mut style = Vec::new();
            let css = attrs
                .iter()
                .find(|(k, _)| k == "style")
                .map(|(_, v)| v.as_str())
                .unwrap_or_default();
            for (prop, value) in parse_style(css) {
                if prop == "text-transform" {
                    match value.as_str() {
                        "uppercase" => format.insert(TextFormat::UPPERCASE),
                        "lowercase" => format.insert(TextFormat::LOWERCASE),
                        "capitalize" => format.insert(TextFormat::CAPITALIZE),
                        _ => {}
                    }
                } else {
                    style.push((prop, value));
                }
            }
            return Some((format, style));
        }
        _ => return None,
    };
    Some((format, Vec::new()))
}

fn block_attrs(attrs: &[(String, String)]) -> Attrs {
    let mut out = Attrs::new();
    let Some((_, css)) = attrs.iter().find(|(k, _)| k == "style") else {
        return out;
    };
    for (prop, value) in parse_style(css) {
        match prop.as_str() {
            "text-align" => {
                if let Ok(format) = serde_json::from_value::<ElementFormat>(Value::from(value)) {
                    out.insert("format".to_string(), Value::from(format.as_str()));
                }
            }
            "padding-inline-start" => {
                let indent = value
                    .trim_start_matches("calc(")
                    .split('*')
                    .next()
                    .and_then(|n| n.trim().parse::<u64>().ok());
                if let Some(indent) = indent.filter(|n| *n > 0) {
                    out.insert("indent".to_string(), Value::from(indent));
                }
            }
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Trims the block edges and drops a lone trailing line break, which only
/// keeps empty blocks open in the rendered form.
fn tidy_inline(children: &mut Vec<SerializedNode>) {
    if let Some(SerializedNode::Text(first)) = children.first_mut() {
        first.text = first.text.trim_start_matches(' ').to_string();
    }
    if let Some(SerializedNode::Text(last)) = children.last_mut() {
        last.text = last.text.trim_end_matches(' ').to_string();
    }
    children.retain(|child| !matches!(child, SerializedNode::Text(t) if t.text.is_empty()));
    if let [SerializedNode::Text(only)] = children.as_slice() {
        if only.text == "\n" {
            children.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;&#39;&#x41;&gt; &bogus;"), "a & b <'A> &bogus;");
    }

    #[test]
    fn stray_less_than_is_text() {
        let tokens = tokenize("1 < 2").unwrap();
        assert_eq!(tokens, vec![Token::Text("1 < 2".to_string())]);
    }

    #[test]
    fn reads_quoted_and_bare_attributes() {
        let tokens = tokenize(r#"<li value=3 aria-checked="true">"#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Open {
                name: "li".to_string(),
                attrs: vec![
                    ("value".to_string(), "3".to_string()),
                    ("aria-checked".to_string(), "true".to_string()),
                ],
            }]
        );
    }
}
