/// One entry of the toolbar color menus. `value: None` clears the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOption {
    pub key: &'static str,
    pub label: &'static str,
    pub value: Option<&'static str>,
}

const fn color(key: &'static str, label: &'static str, value: Option<&'static str>) -> ColorOption {
    ColorOption { key, label, value }
}

pub const TEXT_COLORS: [ColorOption; 10] = [
    color("default", "Default", None),
    color("gray", "Gray", Some("#6b7280")),
    color("brown", "Brown", Some("#92400e")),
    color("red", "Red", Some("#ef4444")),
    color("orange", "Orange", Some("#f97316")),
    color("yellow", "Yellow", Some("#eab308")),
    color("green", "Green", Some("#22c55e")),
    color("blue", "Blue", Some("#3b82f6")),
    color("purple", "Purple", Some("#a855f7")),
    color("pink", "Pink", Some("#ec4899")),
];

pub const BACKGROUND_COLORS: [ColorOption; 10] = [
    color("default", "Default", None),
    color("gray", "Gray", Some("rgba(107, 114, 128, 0.35)")),
    color("brown", "Brown", Some("rgba(245, 158, 11, 0.35)")),
    color("red", "Red", Some("rgba(239, 68, 68, 0.35)")),
    color("orange", "Orange", Some("rgba(249, 115, 22, 0.35)")),
    color("yellow", "Yellow", Some("rgba(234, 179, 8, 0.35)")),
    color("green", "Green", Some("rgba(34, 197, 94, 0.35)")),
    color("blue", "Blue", Some("rgba(59, 130, 246, 0.35)")),
    color("purple", "Purple", Some("rgba(168, 85, 247, 0.35)")),
    color("pink", "Pink", Some("rgba(236, 72, 153, 0.35)")),
];

/// The entry whose value matches the toolbar's current color. An empty
/// string matches the default entry.
pub fn active_color<'a>(colors: &'a [ColorOption], current: &str) -> Option<&'a ColorOption> {
    colors.iter().find(|c| c.value.unwrap_or("") == current)
}
