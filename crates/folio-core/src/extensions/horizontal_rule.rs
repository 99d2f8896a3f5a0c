use crate::commands::{CommandPriority, CommandRegistration, INSERT_HORIZONTAL_RULE};
use crate::extension::{Extension, NodeSpec, ThemeClasses};
use crate::node::HORIZONTAL_RULE_KIND;

pub struct HorizontalRuleExtension;

impl Extension for HorizontalRuleExtension {
    fn name(&self) -> &'static str {
        "horizontal_rule"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void(HORIZONTAL_RULE_KIND)]
    }

    fn theme(&self) -> ThemeClasses {
        super::theme([("hr", "folio-hr")])
    }

    fn commands(&self) -> Vec<CommandRegistration> {
        vec![CommandRegistration::new(
            INSERT_HORIZONTAL_RULE,
            CommandPriority::Editor,
            |editor, ()| {
                editor.draft()?.insert_horizontal_rule()?;
                Ok(true)
            },
        )]
    }
}
