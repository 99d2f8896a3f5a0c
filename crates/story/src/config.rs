use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use folio_core::EditorConfig;
use folio_floating::FloatingConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "folio.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub editor: EditorConfig,
    pub floating: FloatingConfig,
}

impl StoryConfig {
    /// Reads `explicit`, or `folio.json` beside `input` when present.
    pub fn load(explicit: Option<&Path>, input: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => input.and_then(sibling_config),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.editor = config.editor.with_defaults();
        Ok(config)
    }
}

fn sibling_config(input: &Path) -> Option<PathBuf> {
    let path = input.parent()?.join(CONFIG_FILE_NAME);
    path.is_file().then_some(path)
}
