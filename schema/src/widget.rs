//! Widget selection for hinted fields.

use std::fmt;

/// The closed set of field renderers the console knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Widget {
    /// Grid of `model → threshold → {value, disabled}` cells.
    ThresholdMatrix,
    /// Checklist over a declared option set.
    MultiSelect,
    /// Whatever the host form renderer does for the field's schema type.
    #[default]
    Default,
}

/// Selector strings (`ui:field` values) and the widget each one names.
const SELECTORS: &[(&str, Widget)] = &[
    ("MLThresholdsTable", Widget::ThresholdMatrix),
    ("ThresholdMatrix", Widget::ThresholdMatrix),
    ("MultiSelect", Widget::MultiSelect),
];

impl Widget {
    /// Look up a `ui:field` selector. Unknown selectors fall back to
    /// [`Widget::Default`].
    #[must_use]
    pub fn from_selector(selector: &str) -> Self {
        SELECTORS
            .iter()
            .find(|(name, _)| *name == selector.trim())
            .map_or(Widget::Default, |(_, widget)| *widget)
    }

    /// Canonical selector for this widget, `None` for the default renderer.
    #[must_use]
    pub fn selector(self) -> Option<&'static str> {
        match self {
            Widget::ThresholdMatrix => Some("MLThresholdsTable"),
            Widget::MultiSelect => Some("MultiSelect"),
            Widget::Default => None,
        }
    }

    #[must_use]
    pub fn is_default(self) -> bool {
        matches!(self, Widget::Default)
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector().unwrap_or("default"))
    }
}
