pub mod commands;
mod config;
mod draft;
mod edit;
mod editor;
mod error;
mod extension;
pub mod extensions;
mod history;
mod html;
mod markup;
mod node;
pub mod selection;
mod serialize;
mod state;
pub mod style;
mod transaction;

pub use crate::commands::{Command, CommandHandler, CommandPriority, CommandRegistration, HandlerId};
pub use crate::config::*;
pub use crate::draft::Draft;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::extension::*;
pub use crate::history::*;
pub use crate::html::*;
pub use crate::markup::*;
pub use crate::node::*;
pub use crate::selection::{Point, PointKind, Selection};
pub use crate::serialize::*;
pub use crate::state::*;
pub use crate::style::StylePatch;
pub use crate::transaction::*;
