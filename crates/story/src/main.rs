mod config;
mod log;
mod session;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use folio_core::{DocumentSource, Editor, Extension, ExtensionRegistry};
use folio_floating::FloatingExtension;
use tracing::info;

use crate::config::StoryConfig;

#[derive(Parser)]
#[command(name = "folio-story", about = "Replays an editing session and prints the saved document")]
struct Cli {
    /// Snapshot (`.json`) or HTML document to start from. Empty when omitted.
    input: Option<PathBuf>,

    /// Config file. Defaults to `folio.json` next to the input.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the save payload here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn read_source(path: Option<&Path>) -> Result<DocumentSource> {
    let Some(path) = path else {
        return Ok(DocumentSource::Empty);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    Ok(if is_json {
        DocumentSource::Snapshot(raw)
    } else {
        DocumentSource::Markup(raw)
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    log::init()?;

    let config = StoryConfig::load(cli.config.as_deref(), cli.input.as_deref())?;
    let extra: Vec<Box<dyn Extension>> =
        vec![Box::new(FloatingExtension::new(config.floating.clone()))];
    let registry = ExtensionRegistry::rich_text_with(extra)?;
    let mut editor = Editor::new(registry, config.editor.clone());

    let source = read_source(cli.input.as_deref())?;
    editor.load(source).context("failed to load document")?;
    info!(text_len = editor.state().text_content().len(), "document loaded");

    session::run(&mut editor, &config.floating)?;

    let payload = editor.save()?;
    let out = serde_json::to_string_pretty(&payload)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "saved");
        }
        None => println!("{out}"),
    }
    Ok(())
}
