mod block_control;
pub mod colors;
mod config;
mod extension;
pub mod geometry;
mod layer;
mod options;
mod picker;
mod surface;
mod toolbar;

pub use crate::block_control::*;
pub use crate::config::FloatingConfig;
pub use crate::extension::*;
pub use crate::layer::FloatingLayer;
pub use crate::options::*;
pub use crate::picker::*;
pub use crate::surface::{LayoutSurface, RecordedLayout};
pub use crate::toolbar::*;
