use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatingConfig {
    /// Space between the toolbar and the selection it floats over.
    pub vertical_gap: f32,
    /// Horizontal inset of the toolbar from the selection edge.
    pub horizontal_offset: f32,
    /// Height reserved for the block picker when deciding to flip it.
    pub picker_height: f32,
    pub picker_gap: f32,
    pub trigger: char,
    pub max_query_len: usize,
    pub show_toolbar: bool,
    pub show_block_handle: bool,
}

impl Default for FloatingConfig {
    fn default() -> Self {
        Self {
            vertical_gap: 10.,
            horizontal_offset: 5.,
            picker_height: 300.,
            picker_gap: 4.,
            trigger: '/',
            max_query_len: 75,
            show_toolbar: true,
            show_block_handle: true,
        }
    }
}
