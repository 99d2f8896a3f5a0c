use folio_core::{DecoratorSlot, DecoratorSpec, Extension};

use crate::config::FloatingConfig;

pub const BLOCK_PICKER_DECORATOR: &str = "block-picker";
pub const FLOATING_TOOLBAR_DECORATOR: &str = "floating-toolbar";
pub const BLOCK_CONTROL_DECORATOR: &str = "block-control";

/// Declares the floating decorators so hosts can look them up in the
/// registry. Disabled surfaces are left out.
pub struct FloatingExtension {
    config: FloatingConfig,
}

impl FloatingExtension {
    pub fn new(config: FloatingConfig) -> Self {
        Self { config }
    }
}

impl Extension for FloatingExtension {
    fn name(&self) -> &'static str {
        "floating"
    }

    fn decorators(&self) -> Vec<DecoratorSpec> {
        let mut decorators = vec![DecoratorSpec::new(
            BLOCK_PICKER_DECORATOR,
            DecoratorSlot::Floating,
        )];
        if self.config.show_toolbar {
            decorators.push(
                DecoratorSpec::new(FLOATING_TOOLBAR_DECORATOR, DecoratorSlot::Floating).order(10),
            );
        }
        if self.config.show_block_handle {
            decorators.push(DecoratorSpec::new(BLOCK_CONTROL_DECORATOR, DecoratorSlot::Gutter));
        }
        decorators
    }
}
