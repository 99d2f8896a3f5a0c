use folio_core::Editor;

use crate::block_control::BlockControl;
use crate::config::FloatingConfig;
use crate::options::BlockOption;
use crate::picker::BlockPicker;
use crate::surface::LayoutSurface;
use crate::toolbar::FloatingToolbar;

/// The picker, toolbar and block control of one editor, kept in step with
/// its commits.
pub struct FloatingLayer {
    pub picker: BlockPicker,
    pub toolbar: FloatingToolbar,
    pub block_control: BlockControl,
}

impl FloatingLayer {
    pub fn new(options: Vec<BlockOption>, config: FloatingConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            picker: BlockPicker::new(options, &config)?,
            toolbar: FloatingToolbar::new(config.clone()),
            block_control: BlockControl::new(config),
        })
    }

    /// Call after each commit and on resize or scroll.
    pub fn on_update(&mut self, editor: &Editor, surface: &dyn LayoutSurface) {
        let state = editor.state();
        self.picker.on_update(&state);
        if self.picker.placeholder().is_none() {
            self.block_control.picker_closed();
        } else {
            self.block_control.layout_picker(surface);
        }
        self.toolbar.refresh(editor, surface);
    }
}
