//! The built-in extensions. [`crate::ExtensionRegistry::rich_text`] installs
//! all of them.

mod core;
mod history;
mod horizontal_rule;
mod list;
mod rich_text;

pub use self::core::{CoreExtension, EnsureNonEmptyRoot, EnsureTextBlockHasText, MergeAdjacentText};
pub use self::history::HistoryExtension;
pub use self::horizontal_rule::HorizontalRuleExtension;
pub use self::list::{ListExtension, ListItemOrdinals, RemoveEmptyLists};
pub use self::rich_text::{RichTextExtension, TYPING_MERGE_TAG};

use crate::extension::ThemeClasses;

fn theme<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> ThemeClasses {
    entries
        .into_iter()
        .map(|(key, class)| (key.to_string(), class.to_string()))
        .collect()
}
