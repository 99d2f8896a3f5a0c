use crate::extension::ThemeClasses;
use crate::node::{
    HEADING_KIND, HORIZONTAL_RULE_KIND, LIST_ITEM_KIND, LIST_KIND, ListType, Node, NodeData,
    NodeKey, PARAGRAPH_KIND, QUOTE_KIND, ROOT_KIND, TextData, TextFormat,
};
use crate::state::NodeTable;
use crate::style::{parse_style, style_to_css};

const INDENT_STEP_PX: u64 = 40;

/// Inline wrappers, innermost first.
const FORMAT_TAGS: [(TextFormat, &str, &str); 8] = [
    (TextFormat::CODE, "code", "text.code"),
    (TextFormat::HIGHLIGHT, "mark", "text.highlight"),
    (TextFormat::SUBSCRIPT, "sub", "text.subscript"),
    (TextFormat::SUPERSCRIPT, "sup", "text.superscript"),
    (TextFormat::STRIKETHROUGH, "s", "text.strikethrough"),
    (TextFormat::UNDERLINE, "u", "text.underline"),
    (TextFormat::ITALIC, "em", "text.italic"),
    (TextFormat::BOLD, "strong", "text.bold"),
];

/// Renders a document as flat HTML with theme classes.
pub struct HtmlRenderer<'a> {
    theme: &'a ThemeClasses,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(theme: &'a ThemeClasses) -> Self {
        Self { theme }
    }

    pub fn render(&self, table: &NodeTable) -> String {
        let mut out = String::new();
        self.render_node(table, table.root(), &mut out);
        out
    }

    fn render_node(&self, table: &NodeTable, key: NodeKey, out: &mut String) {
        let Some(node) = table.get(key) else {
            return;
        };
        match node.data() {
            NodeData::Text(text) => self.render_text(text, out),
            NodeData::Element(_) => self.render_element(table, node, out),
        }
    }

    fn render_children(&self, table: &NodeTable, node: &Node, out: &mut String) {
        for child in node.children() {
            self.render_node(table, *child, out);
        }
    }

    fn render_element(&self, table: &NodeTable, node: &Node, out: &mut String) {
        let style = block_style(node);
        match node.kind() {
            ROOT_KIND => self.render_children(table, node, out),
            HORIZONTAL_RULE_KIND => {
                out.push_str("<hr");
                self.push_class(out, &["hr"]);
                out.push('>');
            }
            LIST_KIND => {
                let list_type = node.list_type().unwrap_or(ListType::Bullet);
                let (tag, class, data) = match list_type {
                    ListType::Number => ("ol", "list.ol", None),
                    ListType::Bullet => ("ul", "list.ul", None),
                    ListType::Check => ("ul", "list.ul", Some("check")),
                };
                out.push('<');
                out.push_str(tag);
                self.push_class(out, &[class]);
                if let Some(data) = data {
                    push_attr(out, "data-list", data);
                }
                push_style(out, &style);
                out.push('>');
                self.render_children(table, node, out);
                push_close(out, tag);
            }
            LIST_ITEM_KIND => {
                let checked = parent_list_type(table, node)
                    .filter(|ty| *ty == ListType::Check)
                    .map(|_| node.attr("checked").and_then(|v| v.as_bool()).unwrap_or(false));
                out.push_str("<li");
                match checked {
                    Some(true) => self.push_class(out, &["list.listitem", "list.checked"]),
                    Some(false) => self.push_class(out, &["list.listitem", "list.unchecked"]),
                    None => self.push_class(out, &["list.listitem"]),
                }
                if let Some(value) = node.attr("value").and_then(|v| v.as_u64()) {
                    push_attr(out, "value", &value.to_string());
                }
                if let Some(checked) = checked {
                    push_attr(out, "role", "checkbox");
                    push_attr(out, "aria-checked", if checked { "true" } else { "false" });
                }
                push_style(out, &style);
                out.push('>');
                self.render_inline_block(table, node, out);
                push_close(out, "li");
            }
            kind => {
                let (tag, class) = match kind {
                    PARAGRAPH_KIND => ("p".to_string(), "paragraph".to_string()),
                    QUOTE_KIND => ("blockquote".to_string(), "quote".to_string()),
                    HEADING_KIND => {
                        let level = node.heading_level().unwrap_or(1);
                        (format!("h{level}"), format!("heading.h{level}"))
                    }
                    _ => ("div".to_string(), String::new()),
                };
                out.push('<');
                out.push_str(&tag);
                if class.is_empty() {
                    self.push_class(out, &[kind]);
                    push_attr(out, "data-node", kind);
                } else {
                    self.push_class(out, &[class.as_str()]);
                }
                push_style(out, &style);
                out.push('>');
                self.render_inline_block(table, node, out);
                push_close(out, &tag);
            }
        }
    }

    /// Children of a text block. A block without visible text still gets a
    /// line break so it keeps its height.
    fn render_inline_block(&self, table: &NodeTable, node: &Node, out: &mut String) {
        let has_content = node.children().iter().any(|child| {
            table
                .get(*child)
                .is_some_and(|c| c.as_text().is_none_or(|t| !t.text.is_empty()))
        });
        if has_content {
            self.render_children(table, node, out);
        } else {
            out.push_str("<br>");
        }
    }

    fn render_text(&self, text: &TextData, out: &mut String) {
        if text.text.is_empty() {
            return;
        }
        let mut inner = String::new();
        for (ix, line) in text.text.split('\n').enumerate() {
            if ix > 0 {
                inner.push_str("<br>");
            }
            inner.push_str(&escape_html(line));
        }

        for (flag, tag, class) in FORMAT_TAGS {
            if text.format.contains(flag) {
                let mut open = format!("<{tag}");
                self.push_class(&mut open, &[class]);
                open.push('>');
                inner = format!("{open}{inner}</{tag}>");
            }
        }

        let mut decls = Vec::new();
        if let Some(transform) = case_transform(text.format) {
            decls.push(("text-transform".to_string(), transform.to_string()));
        }
        decls.extend(parse_style(&text.style));
        if decls.is_empty() {
            out.push_str(&inner);
        } else {
            out.push_str("<span");
            push_style(out, &decls);
            out.push('>');
            out.push_str(&inner);
            out.push_str("</span>");
        }
    }

    fn push_class(&self, out: &mut String, keys: &[&str]) {
        let classes: Vec<&str> = keys
            .iter()
            .filter_map(|key| self.theme.get(*key))
            .map(String::as_str)
            .filter(|class| !class.is_empty())
            .collect();
        if !classes.is_empty() {
            push_attr(out, "class", &classes.join(" "));
        }
    }
}

fn parent_list_type(table: &NodeTable, node: &Node) -> Option<ListType> {
    node.parent()
        .and_then(|parent| table.get(parent))
        .and_then(Node::list_type)
}

fn case_transform(format: TextFormat) -> Option<&'static str> {
    if format.contains(TextFormat::UPPERCASE) {
        Some("uppercase")
    } else if format.contains(TextFormat::LOWERCASE) {
        Some("lowercase")
    } else if format.contains(TextFormat::CAPITALIZE) {
        Some("capitalize")
    } else {
        None
    }
}

fn block_style(node: &Node) -> Vec<(String, String)> {
    let mut decls = Vec::new();
    if let Some(format) = node.element_format() {
        decls.push(("text-align".to_string(), format.as_str().to_string()));
    }
    if let Some(indent) = node.attr("indent").and_then(|v| v.as_u64()).filter(|n| *n > 0) {
        decls.push((
            "padding-inline-start".to_string(),
            format!("calc({indent} * {INDENT_STEP_PX}px)"),
        ));
    }
    decls
}

fn push_style(out: &mut String, decls: &[(String, String)]) {
    if decls.is_empty() {
        return;
    }
    push_attr(out, "style", &style_to_css(decls));
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_html(value));
    out.push('"');
}

fn push_close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn uppercase_wins_over_other_case_bits() {
        assert_eq!(case_transform(TextFormat::UPPERCASE), Some("uppercase"));
        assert_eq!(case_transform(TextFormat::BOLD), None);
    }
}
