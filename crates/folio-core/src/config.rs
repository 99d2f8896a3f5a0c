use serde::{Deserialize, Serialize};

use crate::extension::ThemeClasses;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Prefix for the root CSS class and the log span name.
    pub namespace: String,
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
    pub history_merge: bool,
    pub editable: bool,
    /// Overrides merged over the classes extensions contribute.
    pub theme: ThemeClasses,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            namespace: "folio".to_string(),
            max_undo: 200,
            max_normalize_iterations: 100,
            history_merge: true,
            editable: true,
            theme: ThemeClasses::new(),
        }
    }
}

impl EditorConfig {
    /// Back-fills zero and empty values, e.g. from a partially written
    /// config file.
    pub fn with_defaults(mut self) -> Self {
        if self.namespace.is_empty() {
            self.namespace = "folio".to_string();
        }
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}
