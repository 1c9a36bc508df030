//! Specialized value editors for hinted configuration fields.
//!
//! The form renderer hands a field to one of these editors when the field's
//! hint selects a non-default [`Widget`]. Editors never mutate the form
//! directly: each edit produces a [`FieldChange`] carrying the field's whole
//! new value, which the host applies with [`FieldChange::apply`].

mod lookup;
mod multiselect;
mod threshold;

use serde_json::Value;
use thiserror::Error;

use cadence_schema::{UiHintTree, Widget};

pub use lookup::{field_schema, set_at, value_at};
pub use multiselect::{MultiSelectEditor, SelectionState};
pub use threshold::{Axis, Cell, CellPatch, Row, ThresholdMatrixEditor};

/// A field's complete new value, addressed by its property path in the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub path: Vec<String>,
    pub value: Value,
}

impl FieldChange {
    /// Write this change into a form document.
    pub fn apply(self, form: &mut Value) {
        set_at(form, &self.path, self.value);
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("field {} holds a non-object value", path.join("."))]
    NotAnObject { path: Vec<String> },
    #[error("no threshold cell {model}/{threshold}")]
    UnknownCell { model: String, threshold: String },
    #[error("threshold {model}/{threshold} must be a finite number")]
    NonFinite { model: String, threshold: String },
    #[error("{option:?} is not an option of field {}", path.join("."))]
    UnknownOption { path: Vec<String>, option: String },
}

/// An editor bound to one form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEditor {
    ThresholdMatrix(ThresholdMatrixEditor),
    MultiSelect(MultiSelectEditor),
    /// Left to the host renderer.
    Default { path: Vec<String> },
}

impl FieldEditor {
    /// Capability lookup: pick the editor for `widget`.
    #[must_use]
    pub fn bind(widget: Widget, path: Vec<String>, field_schema: &Value) -> Self {
        match widget {
            Widget::ThresholdMatrix => {
                FieldEditor::ThresholdMatrix(ThresholdMatrixEditor::from_schema(path, field_schema))
            }
            Widget::MultiSelect => {
                FieldEditor::MultiSelect(MultiSelectEditor::from_schema(path, field_schema))
            }
            Widget::Default => FieldEditor::Default { path },
        }
    }

    #[must_use]
    pub fn widget(&self) -> Widget {
        match self {
            FieldEditor::ThresholdMatrix(_) => Widget::ThresholdMatrix,
            FieldEditor::MultiSelect(_) => Widget::MultiSelect,
            FieldEditor::Default { .. } => Widget::Default,
        }
    }

    #[must_use]
    pub fn path(&self) -> &[String] {
        match self {
            FieldEditor::ThresholdMatrix(editor) => editor.path(),
            FieldEditor::MultiSelect(editor) => editor.path(),
            FieldEditor::Default { path } => path,
        }
    }
}

/// Bind an editor to every field whose hint selects a specialized widget.
///
/// Hinted paths that do not resolve in `schema` are skipped.
#[must_use]
pub fn bind_form(schema: &Value, hints: &UiHintTree) -> Vec<FieldEditor> {
    hints
        .widgets()
        .into_iter()
        .filter_map(|(path, widget)| {
            let Some(field) = field_schema(schema, &path) else {
                tracing::debug!(path = %path.join("."), %widget, "Hinted field missing from schema");
                return None;
            };
            Some(FieldEditor::bind(widget, path, &field))
        })
        .collect()
}
