//! Inline CSS declarations stored on text nodes and on the selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const COLOR: &str = "color";
pub const BACKGROUND_COLOR: &str = "background-color";

/// Splits a declaration list into `(property, value)` pairs, keeping source
/// order. Malformed declarations are skipped.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            Some((prop.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

pub fn style_to_css(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(prop, value)| format!("{prop}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn style_value(style: &str, prop: &str) -> Option<String> {
    parse_style(style)
        .into_iter()
        .rev()
        .find(|(p, _)| p == prop)
        .map(|(_, v)| v)
}

/// Property edits applied to a style string. A `None` value removes the
/// property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StylePatch(BTreeMap<String, Option<String>>);

impl StylePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, prop: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.0.insert(prop.into(), value.map(Into::into));
        self
    }

    pub fn color(self, value: Option<&str>) -> Self {
        self.set(COLOR, value)
    }

    pub fn background_color(self, value: Option<&str>) -> Self {
        self.set(BACKGROUND_COLOR, value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn apply(&self, style: &str) -> String {
        let mut decls = parse_style(style);
        for (prop, value) in &self.0 {
            let existing = decls.iter().position(|(p, _)| p == prop);
            match (existing, value) {
                (Some(ix), Some(value)) => decls[ix].1 = value.clone(),
                (Some(ix), None) => {
                    decls.remove(ix);
                }
                (None, Some(value)) => decls.push((prop.clone(), value.clone())),
                (None, None) => {}
            }
        }
        style_to_css(&decls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_replaces_and_removes_properties() {
        let style = "color: red; background-color: blue;";
        let patched = StylePatch::new().color(Some("#fff")).apply(style);
        assert_eq!(patched, "color: #fff; background-color: blue;");

        let cleared = StylePatch::new().background_color(None).apply(&patched);
        assert_eq!(cleared, "color: #fff;");
    }

    #[test]
    fn parse_skips_malformed_declarations() {
        let decls = parse_style("color: red;; nonsense; font-weight:");
        assert_eq!(decls, vec![("color".to_string(), "red".to_string())]);
        assert_eq!(style_value("COLOR: red", "color").as_deref(), Some("red"));
    }
}
